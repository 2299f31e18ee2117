//! Configuração do VAGA carregada a partir de `vaga.toml`.
//!
//! A struct [`VagaConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `VAGA_BOARDWIRE_API_KEY` tem precedência
//! sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::pipeline::RetryPolicy;

/// Configuração de nível superior carregada de `vaga.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct VagaConfig {
    /// Pontuação mínima de relevância para um job seguir no pipeline.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Máximo de tentativas por estratégia antes de desistir dela.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Atraso base em milissegundos para backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplicador aplicado ao atraso a cada nova retentativa.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Teto em milissegundos para um único atraso de backoff.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Número de workers concorrentes na fase de aplicação.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Aprova automaticamente todos os jobs elegíveis (sem confirmação
    /// humana por job).
    #[serde(default)]
    pub auto_approve: bool,

    /// Caminho do perfil do candidato.
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Diretório de dados (runs, jobs e tentativas persistidos).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// URL do serviço de scoring. Vazio usa o scorer local por keywords.
    #[serde(default)]
    pub scoring_url: String,

    /// URL do serviço de geração de conteúdo. Vazio usa templates locais.
    #[serde(default)]
    pub content_url: String,

    /// URL do serviço de automação de browser.
    #[serde(default = "default_browser_url")]
    pub browser_url: String,

    /// Endpoints das fontes de vagas. URLs vazias desabilitam a fonte.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Endpoints e credenciais por fonte.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub boardwire_url: String,
    #[serde(default)]
    pub boardwire_api_key: String,
    #[serde(default)]
    pub formhire_url: String,
    #[serde(default)]
    pub jobfeed_url: String,
}

// Pontuação mínima padrão: 40.0.
fn default_relevance_threshold() -> f32 {
    40.0
}

// Valor padrão para retentativas máximas: 3.
fn default_max_retries() -> u32 {
    3
}

// Valor padrão para o atraso base: 1000ms.
fn default_base_delay_ms() -> u64 {
    1000
}

// Multiplicador padrão: dobra a cada retentativa.
fn default_backoff_multiplier() -> u32 {
    2
}

// Teto padrão de backoff: 30s.
fn default_backoff_cap_ms() -> u64 {
    30_000
}

// Workers concorrentes padrão: 4.
fn default_workers() -> usize {
    4
}

fn default_profile_path() -> String {
    "applicant.toml".to_string()
}

fn default_data_dir() -> String {
    ".vaga".to_string()
}

fn default_browser_url() -> String {
    "http://127.0.0.1:9515".to_string()
}

impl Default for VagaConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            backoff_cap_ms: default_backoff_cap_ms(),
            workers: default_workers(),
            auto_approve: false,
            profile_path: default_profile_path(),
            data_dir: default_data_dir(),
            scoring_url: String::new(),
            content_url: String::new(),
            browser_url: default_browser_url(),
            sources: SourcesConfig::default(),
        }
    }
}

impl VagaConfig {
    /// Carrega a configuração de `vaga.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("vaga.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<VagaConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de
        // configuração para a credencial do Boardwire.
        if let Ok(key) = std::env::var("VAGA_BOARDWIRE_API_KEY")
            && !key.is_empty()
        {
            config.sources.boardwire_api_key = key;
        }

        Ok(config)
    }

    /// Política de retentativas derivada dos campos de backoff.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            multiplier: self.backoff_multiplier,
            cap_ms: self.backoff_cap_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = VagaConfig::default();
        assert_eq!(config.relevance_threshold, 40.0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.backoff_multiplier, 2);
        assert_eq!(config.workers, 4);
        assert!(!config.auto_approve);
        assert!(config.sources.boardwire_url.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            relevance_threshold = 55.0
            max_retries = 5
            auto_approve = true

            [sources]
            boardwire_url = "https://api.boardwire.example.com"
            boardwire_api_key = "bw-key-123"
        "#;
        let config: VagaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.relevance_threshold, 55.0);
        assert_eq!(config.max_retries, 5);
        assert!(config.auto_approve);
        assert_eq!(config.sources.boardwire_url, "https://api.boardwire.example.com");
        assert_eq!(config.sources.boardwire_api_key, "bw-key-123");
        // Campos ausentes mantêm os defaults.
        assert_eq!(config.workers, 4);
        assert_eq!(config.backoff_cap_ms, 30_000);
    }

    #[test]
    fn retry_policy_mirrors_backoff_fields() {
        let config: VagaConfig = toml::from_str(
            "max_retries = 2\nbase_delay_ms = 500\nbackoff_multiplier = 3\nbackoff_cap_ms = 2000\n",
        )
        .unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay_for_attempt(1), 500);
        assert_eq!(policy.delay_for_attempt(2), 1500);
        assert_eq!(policy.delay_for_attempt(3), 2000); // capped
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VagaConfig::load_from(&dir.path().join("vaga.toml")).unwrap();
        assert_eq!(config.max_retries, 3);
    }
}
