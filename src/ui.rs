//! Interface de terminal do VAGA — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`RunProgress`] acompanha visualmente a
//! execução de um run no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{Job, JobStatus, Run, RunStatus};

/// Indicador visual de progresso para a execução de um run no terminal.
///
/// Exibe um spinner animado durante o pipeline e mensagens coloridas para
/// sucesso (verde), falha (vermelho) e pausa aguardando humano (amarelo).
pub struct RunProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para pausas e avisos.
    yellow: Style,
}

impl RunProgress {
    /// Inicia o spinner com a consulta do run.
    pub fn start(query: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("PENDING: searching for '{query}'"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self::with_bar(pb)
    }

    /// Saída colorida sem spinner, para comandos de consulta (status).
    pub fn attach() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(pb: ProgressBar) -> Self {
        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resultado do run com contadores.
    pub fn finish(&self, run: &Run) {
        self.pb.finish_and_clear();
        let style = match run.status {
            RunStatus::Completed => &self.green,
            RunStatus::Failed => &self.red,
            _ => &self.yellow,
        };
        println!(
            "  {} Run {} — found {}, scored {}, eligible {}, applied {}, failed {}",
            style.apply_to(match run.status {
                RunStatus::Completed => "✓",
                RunStatus::Failed => "✗",
                _ => "…",
            }),
            run.status,
            run.counters.found,
            run.counters.scored,
            run.counters.above_threshold,
            run.counters.applied,
            run.counters.failed,
        );
    }

    /// Exibe uma linha por job com o desfecho individual.
    pub fn job_line(&self, job: &Job) {
        let (mark, style) = match job.status {
            JobStatus::Applied => ("✓", &self.green),
            JobStatus::Failed => ("✗", &self.red),
            JobStatus::AwaitingHuman => ("⏸", &self.yellow),
            _ => ("·", &self.yellow),
        };
        let mut line = format!(
            "  {} [{}] {} — {} ({})",
            style.apply_to(mark),
            job.status,
            job.title,
            job.company,
            job.source,
        );
        if let Some(score) = job.relevance_score {
            line.push_str(&format!(" score={score:.0}"));
        }
        if let Some(reason) = &job.pause_reason {
            line.push_str(&format!(" — {reason}"));
        }
        println!("{line}");
    }

    /// Imprime o registro do run formatado em JSON com estilo colorido.
    pub fn print_run(&self, run: &Run) {
        let style = match run.status {
            RunStatus::Completed => &self.green,
            RunStatus::Failed => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", style.apply_to("─── Run Record ───"));
        println!("{}", serde_json::to_string_pretty(run).unwrap_or_default());
    }
}
