//! GenAI CLI - Command line front-end for the GenAI platform.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use genai_client::{
    AuthState, ChatSession, ClientConfig, FileCredentialStore, GenAiClient, PollConfig,
    PollOutcome, Poller, StatusFetcher, StopReason, TaskTracker,
};
use genai_core::{
    AnalysisId, DocumentId, ResearchStatus, ResumeFeedback, SessionId, StatusReport, Task,
    TaskId, TaskKind,
};

/// GenAI CLI - research, resume feedback, PDF chat, graph QA and text-to-SQL
#[derive(Parser)]
#[command(name = "genai")]
#[command(about = "CLI for the GenAI platform", long_about = None)]
struct Cli {
    /// Platform API address
    #[arg(long, env = "GENAI_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Credentials file (default: ~/.genai/credentials.json)
    #[arg(long, env = "GENAI_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "GENAI_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Submit a research query
    Research {
        /// Research question or topic
        query: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Get research task status
    #[command(name = "research-status")]
    ResearchStatus {
        /// Task ID
        id: String,
    },

    /// Upload a resume for feedback against a job description
    Resume {
        /// Resume file
        file: PathBuf,

        /// Job description to score against
        #[arg(short, long, default_value = "")]
        job_description: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Get resume analysis status
    #[command(name = "resume-feedback")]
    ResumeFeedback {
        /// Analysis ID
        id: String,
    },

    /// Upload PDFs for chat
    #[command(name = "pdf-upload")]
    PdfUpload {
        /// PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a question about uploaded documents
    Chat {
        /// Document IDs to query
        #[arg(short, long = "doc", required = true)]
        documents: Vec<String>,

        /// Continue an existing chat session
        #[arg(short, long)]
        session: Option<String>,

        /// Question
        query: String,
    },

    /// Build the knowledge graph
    #[command(name = "graph-upload")]
    GraphUpload,

    /// Query the knowledge graph
    #[command(name = "graph-query")]
    GraphQuery {
        /// Question
        query: String,
    },

    /// Translate a natural-language question to SQL and run it
    Sql {
        /// Natural-language query
        query: String,
    },
}

/// Polling options shared by the task-submitting commands.
#[derive(Args)]
struct WaitArgs {
    /// Return right after submission instead of polling
    #[arg(long)]
    no_wait: bool,

    /// Seconds between status checks (default depends on the task kind)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: Option<u64>,

    /// Maximum number of status checks (default depends on the task kind)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,
}

impl WaitArgs {
    fn poll_config(&self, preset: PollConfig) -> PollConfig {
        PollConfig::new(
            self.interval_secs
                .map(Duration::from_secs)
                .unwrap_or(preset.interval),
            self.max_attempts.unwrap_or(preset.max_attempts),
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for command output
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("genai_client={level}").parse()?)
                .add_directive(format!("genai_cli={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = ClientConfig::default()
        .with_base_url(cli.api_url)
        .with_request_timeout(Duration::from_secs(cli.timeout_secs));

    let credentials = cli
        .credentials
        .or_else(FileCredentialStore::default_path)
        .ok_or("cannot locate credentials file; set --credentials or HOME")?;
    debug!(path = %credentials.display(), "Using credentials file");

    let auth = AuthState::load(Arc::new(FileCredentialStore::new(credentials)))?;
    let client = GenAiClient::new(&config, auth)?;

    match cli.command {
        Commands::Register { email, password } => {
            let user = client.auth.register(&email, &password).await?;
            println!("Registered and signed in as {} (user {})", user.email, user.id);
        }
        Commands::Login { email, password } => {
            let user = client.auth.login(&email, &password).await?;
            println!("Signed in as {} (user {})", user.email, user.id);
        }
        Commands::Logout => {
            client.auth.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => match client.auth.current_user() {
            Some(user) => println!("{} (user {})", user.email, user.id),
            None => println!("Not signed in"),
        },
        Commands::Research { query, wait } => {
            research(&client, query, wait).await?;
        }
        Commands::ResearchStatus { id } => {
            let status = client.research.status(&TaskId::new(id)).await?;
            print_research(&status);
        }
        Commands::Resume {
            file,
            job_description,
            wait,
        } => {
            resume(&client, file, job_description, wait).await?;
        }
        Commands::ResumeFeedback { id } => {
            let feedback = client.resume.feedback(&AnalysisId::new(id)).await?;
            print_feedback(&feedback);
        }
        Commands::PdfUpload { files } => {
            let uploaded = client.pdf.upload_paths(&files).await?;
            println!("Documents ({}):", uploaded.len());
            println!("{:<12}  {:<10}  {}", "ID", "STATUS", "FILE");
            println!("{}", "-".repeat(60));
            for doc in uploaded {
                println!("{:<12}  {:<10}  {}", doc.document_id, doc.status, doc.filename);
            }
        }
        Commands::Chat {
            documents,
            session,
            query,
        } => {
            let documents = documents.into_iter().map(DocumentId::new).collect();
            let mut chat = match session {
                Some(id) => ChatSession::resume(documents, SessionId::new(id)),
                None => ChatSession::new(documents),
            };
            let reply = client.pdf.ask(&mut chat, &query).await?;
            println!("{}", reply.response);
            if !reply.context.is_null() {
                println!();
                println!("Context: {}", serde_json::to_string_pretty(&reply.context)?);
            }
            println!();
            println!("Session: {}", reply.session_id);
        }
        Commands::GraphUpload => {
            let ack = client.graph.upload().await?;
            println!("{}: {}", ack.status, ack.message);
        }
        Commands::GraphQuery { query } => {
            let ack = client.graph.query(&query).await?;
            println!("{}: {}", ack.status, ack.message);
        }
        Commands::Sql { query } => {
            let reply = client.sql.query(&query).await?;
            println!("Query ID:  {}", reply.query_id);
            println!("SQL:       {}", reply.sql);
            println!("Result:");
            println!("{}", serde_json::to_string_pretty(&reply.result_data)?);
        }
    }

    Ok(())
}

async fn research(
    client: &GenAiClient,
    query: String,
    wait: WaitArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let task_id = client.research.submit(&query).await?;
    println!("Research task started: {}", task_id);

    if wait.no_wait {
        return Ok(());
    }

    let tracker = TaskTracker::new();
    tracker.insert(Task::new(task_id.as_str(), TaskKind::Research, query));

    let config = wait.poll_config(PollConfig::research());
    let outcome = follow::<_, ResearchStatus>(
        task_id.as_str(),
        client.research.clone(),
        &tracker,
        config,
    )
    .await?;

    if let Some(task) = tracker.get(task_id.as_str()) {
        report_outcome(&task, outcome.as_ref());
    }
    Ok(())
}

async fn resume(
    client: &GenAiClient,
    file: PathBuf,
    job_description: String,
    wait: WaitArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let analysis_id = client.resume.upload_path(&file, &job_description).await?;
    println!("Resume uploaded, analysis: {}", analysis_id);

    if wait.no_wait {
        return Ok(());
    }

    let tracker = TaskTracker::new();
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracker.insert(Task::new(analysis_id.as_str(), TaskKind::ResumeAnalysis, name));

    let config = wait.poll_config(PollConfig::resume());
    let outcome = follow::<_, ResumeFeedback>(
        analysis_id.as_str(),
        client.resume.clone(),
        &tracker,
        config,
    )
    .await?;

    if let Some(task) = tracker.get(analysis_id.as_str()) {
        report_outcome(&task, outcome.as_ref());
    }
    Ok(())
}

/// Poll `task_id` into `tracker`, printing each status change.
///
/// Returns `None` if interrupted with Ctrl-C.
async fn follow<F, R>(
    task_id: &str,
    fetcher: F,
    tracker: &TaskTracker,
    config: PollConfig,
) -> Result<Option<PollOutcome>, Box<dyn std::error::Error>>
where
    F: StatusFetcher<Report = R> + 'static,
    R: StatusReport + Send + 'static,
{
    let progress = tracker.clone();
    let id = task_id.to_string();
    let sink = move |report: R| {
        let previous = progress.get(&id).map(|t| t.status);
        if let Some(task) = progress.apply(&id, &report) {
            if previous.as_ref() != Some(&task.status) {
                println!("  status: {}", task.status);
            }
        }
    };

    println!(
        "Waiting for result (every {}s, up to {} checks, Ctrl-C to stop)...",
        config.interval.as_secs_f32(),
        config.max_attempts
    );

    let handle = Poller::spawn(task_id, fetcher, sink, config)?;
    tokio::select! {
        outcome = handle.join() => Ok(Some(outcome?)),
        _ = tokio::signal::ctrl_c() => {
            info!(task_id = %task_id, "Interrupted, stopped polling");
            Ok(None)
        }
    }
}

fn report_outcome(task: &Task, outcome: Option<&PollOutcome>) {
    match outcome.map(|o| o.reason) {
        Some(StopReason::Completed) => {
            match task.kind {
                TaskKind::Research => println!("Research completed."),
                TaskKind::ResumeAnalysis => match task.score {
                    Some(score) => {
                        println!("Your resume has been analyzed with a score of {}/100.", score)
                    }
                    None => println!("Your resume has been analyzed."),
                },
            }
            print_task(task);
        }
        _ => {
            println!("Last known status: {}", task.status);
            println!("  ID: {} ({})", task.task_id, task.kind);
        }
    }
}

fn print_task(task: &Task) {
    println!("  ID:         {}", task.task_id);
    println!("  Kind:       {}", task.kind);
    println!("  Subject:    {}", task.description);
    println!("  Status:     {}", task.status);
    println!("  Created:    {}", format_timestamp(task.created_at));
    if let Some(done) = task.completed_at {
        println!("  Completed:  {}", format_timestamp(done));
    }
    if let Some(score) = task.score {
        println!("  Score:      {}/100", score);
    }
    if let Some(result) = &task.result {
        println!();
        println!("{}", result);
    }
}

fn print_research(status: &ResearchStatus) {
    if let Some(id) = &status.id {
        println!("  ID:         {}", id);
    }
    if let Some(query) = &status.query {
        println!("  Query:      {}", query);
    }
    println!("  Status:     {}", status.status);
    if let Some(created) = status.created_at {
        println!("  Created:    {}", format_timestamp(created));
    }
    if let Some(done) = status.completed_at() {
        println!("  Completed:  {}", format_timestamp(done));
    }
    if let Some(result) = status.result_text() {
        println!();
        println!("{}", result);
    }
}

fn print_feedback(feedback: &ResumeFeedback) {
    if let Some(id) = &feedback.id {
        println!("  ID:         {}", id);
    }
    println!("  Status:     {}", feedback.status);
    if let Some(score) = feedback.score() {
        println!("  Score:      {}/100", score);
    }
    if let Some(done) = feedback.completed_at() {
        println!("  Completed:  {}", format_timestamp(done));
    }
    if let Some(text) = feedback.result_text() {
        println!();
        println!("{}", text);
    }
}

fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
