//! Interface de linha de comando do VAGA baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, demo, status,
//! resume) e flags globais (--max-retries, --verbose).

use clap::{Parser, Subcommand};

/// VAGA — Orquestrador autônomo de busca e candidatura a vagas.
#[derive(Debug, Parser)]
#[command(name = "vaga", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Número máximo de tentativas por estratégia.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa um pipeline completo contra as fontes configuradas.
    Run {
        /// Termos de busca (ex.: "senior rust engineer").
        query: String,

        /// Filtro de localização repassado às fontes.
        #[arg(long)]
        location: Option<String>,

        /// Pontuação mínima de relevância (sobrepõe o vaga.toml).
        #[arg(long)]
        threshold: Option<f32>,

        /// Workers concorrentes na fase de aplicação.
        #[arg(long)]
        workers: Option<usize>,

        /// Aprova automaticamente todos os jobs elegíveis.
        #[arg(long, default_value_t = false)]
        auto_approve: bool,
    },

    /// Mostra contadores e jobs de um run (o mais recente por padrão).
    Status {
        /// Identificador do run; omitido usa o último.
        run_id: Option<String>,
    },

    /// Retoma um job pausado aguardando ação humana.
    Resume {
        /// Identificador do job pausado.
        job_id: String,

        /// Marca o job como aplicado (candidatura concluída manualmente).
        #[arg(long, conflicts_with = "abandon")]
        mark_applied: bool,

        /// Abandona o job pausado.
        #[arg(long, conflicts_with = "mark_applied")]
        abandon: bool,
    },

    /// Executa a demonstração offline do pipeline completo.
    Demo,
}
