//! services/explorer/src/bin/explorer.rs

use explorer_core::{CollectionUpdate, ModelStage, PresetName, UserProfile};
use explorer_lib::{
    adapters::{ConsoleLeaveGuard, FileStore, HttpBackend},
    config::Config,
    error::ExplorerError,
    state::{
        chat::LEAVE_WARNING, outline_form::OutlineInputMode, Explorer, ExplorerDeps,
        GenerationOutcome, OpenTopicOptions, Surface,
    },
};
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Commands:
  topic <text>              open a topic and list suggestions
  heading <text>            open a report heading as a topic
  edit <text>               rename the open topic
  refresh                   fetch new suggestions for the open topic
  select                    toggle select mode (leaving it saves the selection)
  pick <n>                  toggle suggestion n in select mode, or open it
  save-topic                save the open topic
  explore                   list suggestions seeded by saved items
  explore-select            toggle select mode for explore suggestions
  explore-pick <n>          toggle explore suggestion n, or open it
  avoid <a, b>              subjects to avoid in the next generation
  include <a, b>            subjects to include in the next generation
  sections <n>              section count for topic generations
  generate [topic]          generate a report for a topic or the open topic
  outline <file> <topic>    generate from a JSON outline file
  saved                     list saved topics and reports
  open <n>                  show saved report n
  forget-report <n>         forget saved report n
  forget-topic <n>          forget saved topic n
  folders                   list folders with their topics
  folder-new <name>         create a folder
  folder-rename <n> <name>  rename folder n
  folder-delete <n>         delete folder n
  move <topic n> <folder n|none>
  preset [name]             show or select a model preset
  model <stage> <model>     override a stage model for this session
  suggestion-model <model>  set the suggestion model
  user <email> [username]   set the user profile
  status                    show the current surface
  home                      back to home
  quit";

enum Flow {
    Continue,
    Quit,
}

/// 1-based lookup into a printed list.
fn nth<'a, T>(items: &'a [T], raw: &str) -> Option<&'a T> {
    let index = raw.trim().parse::<usize>().ok()?;
    index.checked_sub(1).and_then(|index| items.get(index))
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        println!("{}: none", title);
        return;
    }
    println!("{}:", title);
    for (index, item) in items.iter().enumerate() {
        println!("  {}. {}", index + 1, item);
    }
}

fn print_saved_error(explorer: &mut Explorer) {
    if let Some(error) = explorer.saved.error.take() {
        println!("! {}", error);
    }
}

async fn print_topic_view(explorer: &mut Explorer) {
    if !explorer.topic_view.is_open() {
        println!("No topic is open.");
        return;
    }
    explorer.load_topic_suggestions().await;
    if let Some(topic) = explorer.topic_view.active_topic() {
        println!("# {}", topic);
    }
    print_list("Suggestions", explorer.topic_view.feed.suggestions());
}

/// Runs a generation with Ctrl-C mapped to stop, then prints the outcome.
async fn run_generation<F>(explorer: &mut Explorer, run: F)
where
    F: for<'a> FnOnce(&'a mut Explorer) -> LocalBoxFuture<'a, Option<GenerationOutcome>>,
{
    let chat = explorer.chat.clone();
    let stopper = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            chat.stop_generation().await;
        }
    });
    println!("Generating... (Ctrl-C to stop)");
    let outcome = run(explorer).await;
    stopper.abort();

    match outcome {
        None => println!("Nothing to generate, or a report is already generating."),
        Some(GenerationOutcome::Completed(report)) => {
            println!("\n== {} ==\n\n{}\n", report.title, report.content);
        }
        Some(GenerationOutcome::Cancelled) => println!("Generation stopped."),
        Some(GenerationOutcome::Failed(message)) => println!("! {}", message),
    }
    print_saved_error(explorer);
}

async fn handle(explorer: &mut Explorer, line: &str) -> Result<Flow, ExplorerError> {
    let (command, rest) = line
        .trim()
        .split_once(' ')
        .map(|(command, rest)| (command, rest.trim()))
        .unwrap_or((line.trim(), ""));

    match command {
        "" => {}
        "help" => println!("{}", HELP),
        "quit" | "exit" => {
            if explorer.chat.is_running().await {
                println!("{}", LEAVE_WARNING);
            }
            return Ok(Flow::Quit);
        }
        "topic" => {
            if explorer.open_topic(rest, OpenTopicOptions::default()) {
                print_topic_view(explorer).await;
            }
        }
        "heading" => {
            let options = OpenTopicOptions {
                normalize_heading: true,
                ..OpenTopicOptions::default()
            };
            if explorer.open_topic(rest, options) {
                print_topic_view(explorer).await;
            }
        }
        "edit" => {
            explorer.topic_view.start_editing();
            explorer.topic_view.set_draft_topic(rest);
            if explorer.topic_view.commit_edit() {
                print_topic_view(explorer).await;
            }
        }
        "refresh" => {
            explorer.refresh_topic_suggestions().await;
            print_list("Suggestions", explorer.topic_view.feed.suggestions());
        }
        "select" => {
            explorer.toggle_topic_select_mode().await;
            println!(
                "Select mode {}.",
                if explorer.topic_view.selection.is_active() { "on" } else { "off" }
            );
            print_saved_error(explorer);
        }
        "pick" => {
            let Some(title) = nth(explorer.topic_view.feed.suggestions(), rest).cloned() else {
                println!("No such suggestion.");
                return Ok(Flow::Continue);
            };
            if explorer.topic_view.selection.is_active() {
                explorer.topic_view.selection.toggle_item(&title);
                print_list("Selected", explorer.topic_view.selection.selected());
            } else if explorer.open_topic(&title, OpenTopicOptions::default()) {
                print_topic_view(explorer).await;
            }
        }
        "save-topic" => {
            explorer.save_active_topic().await;
            print_saved_error(explorer);
        }
        "explore" => {
            explorer.refresh_explore().await;
            print_list("Explore", explorer.explore.feed.suggestions());
        }
        "explore-select" => {
            explorer.toggle_explore_select_mode().await;
            print_saved_error(explorer);
        }
        "explore-pick" => {
            let Some(title) = nth(explorer.explore.feed.suggestions(), rest).cloned() else {
                println!("No such suggestion.");
                return Ok(Flow::Continue);
            };
            if explorer.explore.selection.is_active() {
                explorer.explore.selection.toggle_item(&title);
                print_list("Selected", explorer.explore.selection.selected());
            } else if explorer.open_topic(&title, OpenTopicOptions::default()) {
                print_topic_view(explorer).await;
            }
        }
        "avoid" => {
            explorer.view.chat_avoid_topics = rest.to_string();
            explorer.topic_view.avoid_topics = rest.to_string();
            explorer.outline.avoid_topics = rest.to_string();
        }
        "include" => {
            explorer.view.chat_include_topics = rest.to_string();
            explorer.topic_view.include_topics = rest.to_string();
            explorer.outline.include_topics = rest.to_string();
        }
        "sections" => match rest.parse::<u32>() {
            Ok(count) if count > 0 => explorer.view.section_count = count,
            _ => println!("Section count must be a positive number."),
        },
        "generate" => {
            if rest.is_empty() {
                run_generation(explorer, |explorer| {
                    Box::pin(explorer.generate_from_topic_view())
                })
                .await;
            } else {
                explorer.view.composer_value = rest.to_string();
                run_generation(explorer, |explorer| Box::pin(explorer.submit_composer())).await;
            }
        }
        "outline" => {
            let Some((path, topic)) = rest.split_once(' ') else {
                println!("Usage: outline <file> <topic>");
                return Ok(Flow::Continue);
            };
            let json = tokio::fs::read_to_string(path).await?;
            explorer.outline.set_input_mode(OutlineInputMode::Json);
            explorer.outline.set_json_input(json);
            explorer.outline.set_topic(topic);
            run_generation(explorer, |explorer| Box::pin(explorer.submit_outline())).await;
            if let Some(error) = explorer.outline.error() {
                println!("! {}", error);
            }
        }
        "saved" => {
            let topics: Vec<String> = explorer
                .saved
                .topics()
                .iter()
                .map(|topic| topic.prompt.clone())
                .collect();
            let reports: Vec<String> = explorer
                .saved
                .reports()
                .iter()
                .map(|report| format!("{} | {}", report.title, report.preview))
                .collect();
            print_list("Saved topics", &topics);
            print_list("Saved reports", &reports);
        }
        "open" => {
            let Some(id) = nth(explorer.saved.reports(), rest).map(|report| report.id.clone()) else {
                println!("No such report.");
                return Ok(Flow::Continue);
            };
            explorer.open_saved_report(&id);
            if let Some(report) = explorer.view.active_report() {
                println!("\n== {} ==\n\n{}\n", report.title, report.content);
            }
        }
        "forget-report" => {
            if let Some(id) = nth(explorer.saved.reports(), rest).map(|report| report.id.clone()) {
                explorer.forget_report(&id).await;
                print_saved_error(explorer);
            }
        }
        "forget-topic" => {
            if let Some(id) = nth(explorer.saved.topics(), rest).map(|topic| topic.id.clone()) {
                explorer.forget_topic(&id).await;
                print_saved_error(explorer);
            }
        }
        "folders" => {
            let (grouped, uncategorized) = explorer
                .collections
                .group_topics(explorer.saved.topics());
            for (index, (collection, topics)) in grouped.iter().enumerate() {
                println!("{}. {} ({})", index + 1, collection.name, topics.len());
                for topic in topics {
                    println!("     - {}", topic.prompt);
                }
            }
            println!("Uncategorized ({})", uncategorized.len());
            for topic in uncategorized {
                println!("     - {}", topic.prompt);
            }
        }
        "folder-new" => {
            if let Some(collection) = explorer.create_collection(rest).await {
                println!("Created {}.", collection.name);
            }
            print_saved_error(explorer);
        }
        "folder-rename" => {
            let Some((index, name)) = rest.split_once(' ') else {
                println!("Usage: folder-rename <n> <name>");
                return Ok(Flow::Continue);
            };
            if let Some(id) = nth(explorer.collections.collections(), index).map(|c| c.id.clone()) {
                explorer
                    .update_collection(&id, &CollectionUpdate::rename(name.trim()))
                    .await;
                print_saved_error(explorer);
            }
        }
        "folder-delete" => {
            if let Some(id) = nth(explorer.collections.collections(), rest).map(|c| c.id.clone()) {
                explorer.delete_collection(&id).await;
                print_saved_error(explorer);
            }
        }
        "move" => {
            let Some((topic, folder)) = rest.split_once(' ') else {
                println!("Usage: move <topic n> <folder n|none>");
                return Ok(Flow::Continue);
            };
            let Some(topic_id) = nth(explorer.saved.topics(), topic).map(|t| t.id.clone()) else {
                println!("No such topic.");
                return Ok(Flow::Continue);
            };
            let folder_id = match folder.trim() {
                "none" => None,
                index => match nth(explorer.collections.collections(), index) {
                    Some(collection) => Some(collection.id.clone()),
                    None => {
                        println!("No such folder.");
                        return Ok(Flow::Continue);
                    }
                },
            };
            explorer.move_topic(&topic_id, folder_id.as_deref()).await;
            print_saved_error(explorer);
        }
        "preset" => {
            if let Some(preset) = PresetName::from_key(rest) {
                explorer.settings.select_preset(preset);
            } else if !rest.is_empty() {
                println!("Unknown preset. Choose fast, slower or slowest.");
            }
            let models = explorer.settings.stage_models();
            println!("Preset: {}", explorer.settings.selected_preset().label());
            for stage in ModelStage::ALL {
                println!("  {:<8} {}", stage.label(), models.get(stage));
            }
        }
        "model" => {
            let stage = rest.split_once(' ').and_then(|(stage, model)| {
                ModelStage::ALL
                    .into_iter()
                    .find(|candidate| candidate.key() == stage)
                    .map(|stage| (stage, model.trim()))
            });
            match stage {
                Some((stage, model)) => explorer.settings.set_stage_model(stage, model),
                None => println!("Usage: model <outline|writer|editor> <model>"),
            }
        }
        "suggestion-model" => explorer.settings.set_suggestion_model(rest),
        "user" => {
            let (email, username) = rest.split_once(' ').unwrap_or((rest, ""));
            explorer.set_user(UserProfile::new(email, username)).await;
            print_saved_error(explorer);
        }
        "status" => {
            let state = explorer.main_view_state().await;
            let surface = match state.surface {
                Surface::Home => "home",
                Surface::ReportView => "report view",
                Surface::TopicView => "topic view",
                Surface::Chat => "chat",
            };
            println!("Surface: {}", surface);
            if let Some(entry) = state.generating_report {
                let label = if entry.is_generating { "generating" } else { "unsaved" };
                println!("Report ({}): {}", label, entry.topic);
            }
            if explorer.is_sidebar_syncing() {
                println!("Syncing...");
            }
        }
        "home" => explorer.reset().await,
        other => println!("Unknown command '{}'. Type 'help'.", other),
    }
    Ok(Flow::Continue)
}

#[tokio::main]
async fn main() -> Result<(), ExplorerError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting explorer...");

    // --- 2. Initialize Adapters ---
    let store = Arc::new(FileStore::open(&config.state_file));
    let api_base = config.resolve_api_base(&*store);
    info!(api_base = %api_base, state_file = %config.state_file.display(), "Using API base");
    let backend = Arc::new(HttpBackend::new(api_base, config.connect_timeout)?);
    let leave_guard = Arc::new(ConsoleLeaveGuard::new());

    // --- 3. Build the Explorer State ---
    let mut explorer = Explorer::new(ExplorerDeps {
        backend,
        store,
        leave_guard: leave_guard.clone(),
        limits: config.limits,
        summary_limits: Default::default(),
        fallback_user: UserProfile::new(
            config.default_user_email.clone().unwrap_or_default(),
            config.default_username.clone().unwrap_or_default(),
        ),
    });
    explorer.sync().await;
    if let Some(error) = explorer.saved.error.take() {
        warn!(error = %error, "Initial sync failed");
    }

    // --- 4. Run the Command Loop ---
    println!("Report explorer. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match handle(&mut explorer, &line).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("! {}", e),
        }
    }

    if let Some(warning) = leave_guard.warning() {
        warn!("{}", warning);
    }
    info!("Explorer stopped.");
    Ok(())
}
