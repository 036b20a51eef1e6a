//! # StudyMate CLI (`studymate`)
//!
//! Turns a PDF or image into study material with a document model:
//! extracted text, a Markdown summary, and a timed multiple-choice quiz.
//!
//! ```bash
//! studymate --guest summarize notes.pdf
//! studymate --user u-42 --language en quiz notes.pdf --count 5 --timer total --timer-value 3
//! studymate --guest history
//! ```
//!
//! The session is saved under `STUDYMATE_STORAGE_DIR` after every command,
//! so guest limits and the last upload carry over between runs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use studymate::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{FileData, Identity, Language, QuizQuestion, TimerConfig},
    models::dto::response::{FinishReason, SessionState},
    services::{
        history_service::SaveOutcome,
        quiz_session_service::{format_clock, QuizSession},
        quiz_timer::QuizTimer,
        study_service::{Completion, StudyService, StudyWorkspace},
    },
};

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Parser)]
#[command(
    name = "studymate",
    version,
    about = "Summaries and quizzes from your study documents"
)]
struct Cli {
    /// Continue as a guest with limited generations.
    #[arg(long, global = true, conflicts_with = "user")]
    guest: bool,

    /// Sign in with this user id.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Display name for `--user`.
    #[arg(long, global = true, requires = "user")]
    name: Option<String>,

    /// Output language for summaries and quizzes.
    #[arg(long, global = true, value_enum)]
    language: Option<LanguageArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the text of a document for editing.
    Extract {
        file: PathBuf,

        /// Write the text here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Summarize a document as Markdown.
    Summarize {
        file: PathBuf,

        /// Use this edited text instead of the document itself.
        #[arg(long)]
        edited: Option<PathBuf>,

        /// Save the result to history.
        #[arg(long)]
        save: bool,
    },

    /// Generate a quiz and take it in the terminal.
    Quiz {
        file: PathBuf,

        /// Use this edited text instead of the document itself.
        #[arg(long)]
        edited: Option<PathBuf>,

        /// Number of questions to generate.
        #[arg(long)]
        count: Option<u32>,

        #[arg(long, value_enum)]
        timer: Option<TimerArg>,

        /// Seconds per question, or total minutes.
        #[arg(long)]
        timer_value: Option<u32>,
    },

    /// List saved history, newest first.
    History {
        /// Load an entry back into the session and print it.
        #[arg(long)]
        open: Option<String>,
    },

    /// Delete a history entry.
    Delete { id: String },

    /// Sign out and clear the session.
    Logout,
}

#[derive(Clone, Copy, ValueEnum)]
enum LanguageArg {
    En,
    Ar,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::En => Language::En,
            LanguageArg::Ar => Language::Ar,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TimerArg {
    Off,
    PerQuestion,
    Total,
}

fn timer_config(mode: TimerArg, value: Option<u32>) -> TimerConfig {
    match mode {
        TimerArg::Off => TimerConfig::off(),
        TimerArg::PerQuestion => TimerConfig::per_question(value.unwrap_or(60)),
        TimerArg::Total => TimerConfig::total(value.unwrap_or(10)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli, Config::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error [{}]: {}", err.error_code(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> AppResult<()> {
    let app = AppState::new(config)?;
    let mut workspace = app.load_workspace();

    if let Some(language) = cli.language {
        workspace.set_language(language.into());
    }

    let result = match cli.command {
        Commands::Logout => {
            workspace.logout();
            println!("Signed out.");
            Ok(())
        }
        command => match resolve_identity(&mut workspace, cli.guest, cli.user, cli.name) {
            Ok(()) => dispatch(&app, &mut workspace, command).await,
            Err(err) => Err(err),
        },
    };

    // saved even when the command failed; a lost usage record is an error
    let saved = app.save_workspace(&workspace);
    result?;
    saved.map(|_| ())
}

/// A different account from the saved one starts a fresh session.
fn resolve_identity(
    workspace: &mut StudyWorkspace,
    guest: bool,
    user: Option<String>,
    name: Option<String>,
) -> AppResult<()> {
    let requested = match (guest, user) {
        (true, _) => Some(Identity::guest()),
        (false, Some(id)) => {
            let known_name = workspace
                .user()
                .filter(|u| !u.is_guest && u.id == id)
                .map(|u| u.name.clone());
            let name = name.or(known_name).unwrap_or_else(|| id.clone());
            Some(Identity::member(&id, &name))
        }
        (false, None) => None,
    };

    match requested {
        Some(identity) => {
            if workspace.switch_identity(identity) {
                println!("Switched account; the previous session was cleared.");
            }
            Ok(())
        }
        None if workspace.user().is_none() => Err(AppError::ValidationError(
            "Pass --guest or --user <ID> to start".to_string(),
        )),
        None => Ok(()),
    }
}

async fn dispatch(app: &AppState, workspace: &mut StudyWorkspace, command: Commands) -> AppResult<()> {
    match command {
        Commands::Extract { file, output } => {
            load_file(app, workspace, &file)?;
            let service = app.study_service()?;
            expect_applied(service.extract_text(workspace).await?)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, workspace.extracted_text())?;
                    println!("Extracted text written to {}", path.display());
                    println!("Edit it, then pass it back with --edited {}", path.display());
                }
                None => println!("{}", workspace.extracted_text()),
            }
            workspace.back_to_menu();
            Ok(())
        }
        Commands::Summarize { file, edited, save } => {
            prepare_source(app, workspace, &file, edited.as_deref())?;
            let service = app.study_service()?;
            expect_applied(service.summarize(workspace).await?)?;

            println!("{}", workspace.summary().unwrap_or_default());
            if save {
                report_save(service.save_to_history(workspace));
            }
            Ok(())
        }
        Commands::Quiz {
            file,
            edited,
            count,
            timer,
            timer_value,
        } => {
            prepare_source(app, workspace, &file, edited.as_deref())?;
            workspace.open_quiz_config();
            if let Some(count) = count {
                workspace.set_question_count(count);
            }
            if let Some(mode) = timer {
                workspace.set_timer(timer_config(mode, timer_value));
            }

            let service = app.study_service()?;
            println!("Generating {} questions...", workspace.question_count());
            expect_applied(service.generate_quiz(workspace).await?)?;

            let session = workspace.start_quiz_session()?;
            if let Some(budget) = session.remaining_seconds() {
                println!("Time limit: {}", format_clock(budget));
            }
            run_quiz(&service, workspace, session).await
        }
        Commands::History { open } => {
            let owner = current_user_id(workspace)?;
            if let Some(id) = open {
                let item = app.history_service.get(&owner, &id)?;
                println!("{} ({})", item.file_name, item.language.display_name());
                if let Some(summary) = &item.summary {
                    println!("\n{}", summary);
                }
                workspace.load_history_item(item);
                return Ok(());
            }

            let items = app.history_service.list(&owner)?;
            if items.is_empty() {
                println!("No saved history.");
            }
            for item in items {
                let mut contents = Vec::new();
                if item.summary.is_some() {
                    contents.push("summary".to_string());
                }
                if let Some(quiz) = &item.quiz {
                    contents.push(format!("{} questions", quiz.len()));
                }
                println!(
                    "{}  {}  {}  [{}]",
                    item.id,
                    item.timestamp.format("%Y-%m-%d %H:%M"),
                    item.file_name,
                    contents.join(", ")
                );
            }
            workspace.open_history();
            Ok(())
        }
        Commands::Delete { id } => {
            let owner = current_user_id(workspace)?;
            let remaining = app.history_service.delete_owned(&owner, &id)?;
            println!("{} item(s) left in history.", remaining.len());
            Ok(())
        }
        Commands::Logout => Ok(()),
    }
}

fn current_user_id(workspace: &StudyWorkspace) -> AppResult<String> {
    workspace
        .user()
        .map(|u| u.id.clone())
        .ok_or_else(|| AppError::ValidationError("Not signed in".to_string()))
}

/// Keeps the previous extraction when the same document is passed again.
fn load_file(app: &AppState, workspace: &mut StudyWorkspace, path: &Path) -> AppResult<()> {
    let file = FileData::from_path(path, app.config.max_upload_bytes)?;
    if workspace.current_file() != Some(&file) {
        workspace.select_file(file);
    }
    Ok(())
}

fn prepare_source(
    app: &AppState,
    workspace: &mut StudyWorkspace,
    path: &Path,
    edited: Option<&Path>,
) -> AppResult<()> {
    load_file(app, workspace, path)?;
    if let Some(edited) = edited {
        let text = std::fs::read_to_string(edited)?;
        workspace.use_edited_text(&text);
    }
    Ok(())
}

fn expect_applied(completion: Completion) -> AppResult<()> {
    match completion {
        Completion::Applied => Ok(()),
        Completion::Failed(err) => Err(err),
        Completion::Discarded => Err(AppError::InternalError(
            "The response arrived after the request was abandoned".to_string(),
        )),
    }
}

fn report_save(result: AppResult<SaveOutcome>) {
    match result {
        Ok(outcome) if outcome.evicted > 0 => println!(
            "Saved to history. {} older item(s) were removed to make room.",
            outcome.evicted
        ),
        Ok(_) => println!("Saved to history."),
        Err(err) => eprintln!("Could not save to history: {}", err),
    }
}

async fn run_quiz(
    service: &StudyService,
    workspace: &mut StudyWorkspace,
    mut session: QuizSession,
) -> AppResult<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("Keys: a-d answer, n next, p previous, f finish");

    loop {
        play(&mut session, &mut input).await?;
        print_result(&session);

        loop {
            println!("[r] review  [t] retake  [s] save  [q] quit");
            let Some(line) = input.next_line().await? else {
                return Ok(());
            };
            match line.trim() {
                "r" => {
                    if session.enter_review() {
                        print_review(&session);
                        session.exit_review();
                    }
                }
                "t" => {
                    session.retake();
                    break;
                }
                "s" => report_save(service.save_to_history(workspace)),
                "q" => {
                    workspace.back_to_menu();
                    return Ok(());
                }
                other => println!("Unknown choice '{}'", other),
            }
        }
    }
}

/// Drives one attempt until it finishes, interleaving key presses with
/// timer ticks.
async fn play(session: &mut QuizSession, input: &mut InputLines) -> AppResult<()> {
    let (sender, mut ticks) = mpsc::unbounded_channel();
    let mut timer = QuizTimer::new();
    if session.has_timer() {
        timer.start(session.attempt(), sender);
    }

    print_question(session);
    while session.state() == SessionState::Active {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    session.finish();
                    break;
                };
                handle_key(session, line.trim());
                if session.state() == SessionState::Active {
                    print_question(session);
                }
            }
            Some(tick) = ticks.recv() => {
                session.apply_tick(tick);
                if let Some(remaining) = session.remaining_seconds() {
                    if remaining > 0 && (remaining <= 10 || remaining % 30 == 0) {
                        println!("  {} left", format_clock(remaining));
                    }
                }
            }
        }
    }

    timer.cancel();
    Ok(())
}

fn handle_key(session: &mut QuizSession, key: &str) {
    match key {
        "n" => {
            session.next();
        }
        "p" => session.previous(),
        "f" => session.finish(),
        _ => {
            let index = match key {
                "a" => 0,
                "b" => 1,
                "c" => 2,
                "d" => 3,
                _ => {
                    println!("Unknown key '{}'", key);
                    return;
                }
            };
            if !session.select_current(index) {
                println!("Option '{}' is not available", key);
            }
        }
    }
}

fn print_question(session: &QuizSession) {
    let Some(question) = session.questions().get(session.pointer()) else {
        return;
    };
    let clock = session
        .remaining_seconds()
        .map(|s| format!("  [{}]", format_clock(s)))
        .unwrap_or_default();
    println!(
        "\nQuestion {}/{}{}",
        session.pointer() + 1,
        session.questions().len(),
        clock
    );
    println!("{}", question.question);
    let selected = session.current_selection();
    for (i, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(i) { "*" } else { " " };
        println!("{} {}) {}", marker, QuizQuestion::option_label(i), option);
    }
}

fn print_result(session: &QuizSession) {
    if session.finish_reason() == Some(FinishReason::TimeExpired) {
        println!("\nTime's up!");
    }
    let Some(score) = session.score() else {
        return;
    };
    println!(
        "\nScore: {}/{} ({}%) {}",
        score.correct,
        score.total,
        score.percentage(),
        if score.passed() { "passed" } else { "keep practicing" }
    );
}

fn print_review(session: &QuizSession) {
    for (i, entry) in session.review_entries().iter().enumerate() {
        let question = entry.question;
        let verdict = if entry.is_correct { "correct" } else { "wrong" };
        println!("\n{}. {} ({})", i + 1, question.question, verdict);
        let yours = entry
            .selected
            .and_then(|s| question.options.get(s).map(|o| (s, o)))
            .map(|(s, o)| format!("{}) {}", QuizQuestion::option_label(s), o))
            .unwrap_or_else(|| "skipped".to_string());
        println!("   Your answer: {}", yours);
        if let Some(correct) = question.options.get(question.correct_answer_index) {
            println!(
                "   Correct answer: {}) {}",
                QuizQuestion::option_label(question.correct_answer_index),
                correct
            );
        }
        println!("   {}", question.explanation);
    }
}
