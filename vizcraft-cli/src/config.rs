//! Settings read from the environment

use std::path::{Path, PathBuf};
use vizcraft_agent::AgentConfig;
use vizcraft_error::{Error, Result};
use vizcraft_llm::{ProviderConfig, ProviderType};
use vizcraft_sandbox::SandboxConfig;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Everything the CLI needs to start a session
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub anthropic_api_key: String,
    pub provider: ProviderType,
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub image: String,
    pub volume: String,
    /// Host export directory, possibly relative
    pub output_dir: PathBuf,
    pub max_turns: usize,
    /// HTTP timeout for provider requests
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Both API keys are required whichever provider is selected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| Error::credential_missing(key));

        let openai_api_key = required(OPENAI_API_KEY)?;
        let anthropic_api_key = required(ANTHROPIC_API_KEY)?;

        let provider = match var("VIZCRAFT_PROVIDER") {
            Some(name) => name.parse()?,
            None => ProviderType::OpenAI,
        };

        let sandbox = SandboxConfig::default();
        let agent = AgentConfig::default();

        let max_turns = match var("VIZCRAFT_MAX_TURNS") {
            Some(raw) => positive("VIZCRAFT_MAX_TURNS", &raw)?,
            None => agent.max_turns,
        };
        let timeout_secs = match var("VIZCRAFT_TIMEOUT_SECS") {
            Some(raw) => Some(positive("VIZCRAFT_TIMEOUT_SECS", &raw)?),
            None => None,
        };

        Ok(Self {
            openai_api_key,
            anthropic_api_key,
            provider,
            model: var("VIZCRAFT_MODEL"),
            image: var("VIZCRAFT_IMAGE").unwrap_or(sandbox.image),
            volume: var("VIZCRAFT_VOLUME").unwrap_or(sandbox.workspace_volume),
            output_dir: var("VIZCRAFT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(sandbox.output_dir),
            max_turns,
            timeout_secs,
        })
    }

    /// Create the output directory if needed and return its absolute path.
    pub fn prepare_output_dir(&self) -> Result<PathBuf> {
        let io_err = |e: std::io::Error| {
            Error::from(e)
                .with_operation("config::prepare_output_dir")
                .with_context("path", self.output_dir.display().to_string())
        };

        std::fs::create_dir_all(&self.output_dir).map_err(io_err)?;
        self.output_dir.canonicalize().map_err(io_err)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let config = match self.provider {
            ProviderType::OpenAI => ProviderConfig::openai(self.openai_api_key.as_str()),
            ProviderType::Anthropic => ProviderConfig::anthropic(self.anthropic_api_key.as_str()),
        };
        let config = match &self.model {
            Some(model) => config.with_model(model.as_str()),
            None => config,
        };
        match self.timeout_secs {
            Some(secs) => config.with_timeout(secs),
            None => config,
        }
    }

    /// `output_dir` must be absolute; Docker rejects relative bind sources.
    pub fn sandbox_config(&self, output_dir: &Path) -> SandboxConfig {
        SandboxConfig {
            image: self.image.clone(),
            workspace_volume: self.volume.clone(),
            output_dir: output_dir.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            max_turns: self.max_turns,
            ..Default::default()
        }
    }
}

fn positive<T>(var: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(Error::config_invalid(
            var,
            format!("expected a positive integer, got '{}'", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use vizcraft_error::ErrorKind;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    const KEYS: [(&str, &str); 2] = [(OPENAI_API_KEY, "sk-openai"), (ANTHROPIC_API_KEY, "sk-ant")];

    #[test]
    fn test_defaults() {
        let settings = settings(&KEYS).unwrap();

        assert_eq!(settings.provider, ProviderType::OpenAI);
        assert_eq!(settings.model, None);
        assert_eq!(settings.image, "viz-agent-manim");
        assert_eq!(settings.volume, "agent_workspace");
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.max_turns, 25);
        assert_eq!(settings.timeout_secs, None);

        let provider = settings.provider_config();
        assert_eq!(provider.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(provider.timeout_secs, Some(300));
        assert_eq!(provider.default_model.as_deref(), Some("gpt-5.2-codex"));
    }

    #[test]
    fn test_missing_credentials() {
        let err = settings(&[(ANTHROPIC_API_KEY, "sk-ant")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);
        assert_eq!(err.context_value("var"), Some(OPENAI_API_KEY));

        let err = settings(&[(OPENAI_API_KEY, "sk-openai"), (ANTHROPIC_API_KEY, "  ")]).unwrap_err();
        assert_eq!(err.context_value("var"), Some(ANTHROPIC_API_KEY));
    }

    #[test]
    fn test_overrides() {
        let mut vars = KEYS.to_vec();
        vars.extend([
            ("VIZCRAFT_PROVIDER", "Anthropic"),
            ("VIZCRAFT_MODEL", "claude-test"),
            ("VIZCRAFT_IMAGE", "manim:dev"),
            ("VIZCRAFT_MAX_TURNS", "5"),
            ("VIZCRAFT_TIMEOUT_SECS", " 45 "),
        ]);
        let settings = settings(&vars).unwrap();

        let provider = settings.provider_config();
        assert_eq!(provider.provider_type, ProviderType::Anthropic);
        assert_eq!(provider.timeout_secs, Some(45));
        assert_eq!(provider.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(provider.default_model.as_deref(), Some("claude-test"));

        let agent = settings.agent_config();
        assert_eq!(agent.max_turns, 5);
        assert_eq!(agent.model.as_deref(), Some("claude-test"));

        let sandbox = settings.sandbox_config(Path::new("/abs/output"));
        assert_eq!(sandbox.image, "manim:dev");
        assert_eq!(sandbox.user, "root");
        assert_eq!(sandbox.output_dir, PathBuf::from("/abs/output"));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = KEYS.to_vec();
        vars.push(("VIZCRAFT_MAX_TURNS", "zero"));
        assert_eq!(settings(&vars).unwrap_err().kind(), ErrorKind::ConfigInvalid);

        let mut vars = KEYS.to_vec();
        vars.push(("VIZCRAFT_PROVIDER", "gemini"));
        assert_eq!(settings(&vars).unwrap_err().kind(), ErrorKind::ConfigInvalid);

        for raw in ["0", "-5", "soon"] {
            let mut vars = KEYS.to_vec();
            vars.push(("VIZCRAFT_TIMEOUT_SECS", raw));
            let err = settings(&vars).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        }
    }

    #[test]
    fn test_prepare_output_dir() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&KEYS).unwrap();
        settings.output_dir = dir.path().join("videos");

        let absolute = settings.prepare_output_dir().unwrap();
        assert!(absolute.is_absolute());
        assert!(absolute.is_dir());
        assert!(absolute.ends_with("videos"));

        // already there
        assert_eq!(settings.prepare_output_dir().unwrap(), absolute);
    }
}
