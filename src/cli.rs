use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

use crate::application::{AppContext, AppError, AppResult, MaintProjectService};
use crate::domain::datetime::{parse_due_date, timestamp};
use crate::domain::report::projects_report;
use crate::domain::*;
use crate::ports::{AppConfig, DocumentRef};

const DEFAULT_STATUS_ORDER: [ProjectStatus; 3] = [
    ProjectStatus::Late,
    ProjectStatus::Running,
    ProjectStatus::Finished,
];

pub fn build() -> Command {
    Command::new("maint")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Maintenance project tracking")
        .long_about("Track maintenance projects and standard documents.\n\nProject status is derived from each project's history: delivered projects are finished, projects past their ETA are late, everything else is running.")
        .arg(
            Arg::new("env")
                .long("env")
                .value_name("ENV")
                .help("Environment whose collections are used (development, test, production; can also be set via MAINT_ENV)")
                .global(true),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path of the local document store file")
                .global(true),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .value_name("PERSON")
                .help("Person signed in and stamped on events (can also be set via MAINT_USER)")
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("projects")
                .about("Maintenance project operations")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("List projects as JSON")
                        .arg(
                            Arg::new("status")
                                .long("status")
                                .value_name("STATUS")
                                .action(ArgAction::Append)
                                .help("Only projects with this status (repeatable)"),
                        )
                        .arg(
                            Arg::new("sort")
                                .long("sort")
                                .value_parser(["status", "priority"])
                                .help("Sort by status groups or by priority"),
                        )
                        .arg(
                            Arg::new("order")
                                .long("order")
                                .value_name("STATUSES")
                                .value_delimiter(',')
                                .help("Status group order used with --sort status (default: late,running,finished)"),
                        ),
                )
                .subcommand(
                    Command::new("get")
                        .about("Get a project by document ID")
                        .arg(Arg::new("id").help("Project document ID").required(true).index(1)),
                )
                .subcommand(with_draft_args(
                    Command::new("add").about("Create a project"),
                    true,
                ))
                .subcommand(with_draft_args(
                    Command::new("update")
                        .about("Edit a project")
                        .arg(Arg::new("id").help("Project document ID").required(true).index(1)),
                    false,
                ))
                .subcommand(
                    Command::new("status")
                        .about("Share a status update")
                        .arg(Arg::new("id").help("Project document ID").required(true).index(1))
                        .arg(
                            Arg::new("message")
                                .long("message")
                                .short('m')
                                .required(true)
                                .help("Status message"),
                        ),
                )
                .subcommand(
                    Command::new("deliver")
                        .about("Mark a project as delivered")
                        .arg(Arg::new("id").help("Project document ID").required(true).index(1))
                        .arg(
                            Arg::new("message")
                                .long("message")
                                .short('m')
                                .help("Optional delivery note"),
                        ),
                )
                .subcommand(Command::new("summary").about("Count projects per status"))
                .subcommand(Command::new("export").about("Export projects as CSV")),
        )
        .subcommand(
            Command::new("docs")
                .about("Standard document operations")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List standard documents as JSON")),
        )
}

fn with_draft_args(cmd: Command, creating: bool) -> Command {
    cmd.arg(
        Arg::new("title")
            .long("title")
            .required(creating)
            .help("Short project title"),
    )
    .arg(
        Arg::new("eta")
            .long("eta")
            .required(creating)
            .help("Due date, YYYY-MM-DD or RFC 3339"),
    )
    .arg(Arg::new("description").long("description").help("Longer description"))
    .arg(
        Arg::new("requester")
            .long("requester")
            .help("Who asked for the project (defaults to the signed-in person)"),
    )
    .arg(Arg::new("team").long("team").help("Team in charge"))
    .arg(
        Arg::new("priority")
            .long("priority")
            .help("low, medium or high (default: medium)"),
    )
    .arg(
        Arg::new("pred-prev")
            .long("pred-prev")
            .value_parser(clap::value_parser!(bool))
            .num_args(0..=1)
            .default_missing_value("true")
            .help("Predictive/preventive maintenance"),
    )
}

/// Applies `--env`, `--store` and `--user` on top of the saved config.
/// Flags win over `MAINT_ENV`/`MAINT_USER`, which win over saved values.
pub fn apply_overrides(
    config: &mut AppConfig,
    matches: &ArgMatches,
    var: impl Fn(&str) -> Option<String>,
) -> DomainResult<()> {
    let environment = string_arg(matches, "env").or_else(|| var("MAINT_ENV"));
    if let Some(env) = environment {
        config.environment = env.parse::<Environment>()?;
    }

    if let Some(path) = matches.get_one::<PathBuf>("store") {
        config.store_path = Some(path.clone());
    }

    let user = string_arg(matches, "user")
        .or_else(|| var("MAINT_USER"))
        .filter(|user| !user.trim().is_empty());
    if let Some(user) = user {
        config.current_user = Some(Person(user));
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StdDocumentView {
    revision_due: bool,
    #[serde(flatten)]
    document: StdDocument,
}

#[derive(Serialize)]
struct ProjectView {
    code: String,
    status: ProjectStatus,
    #[serde(flatten)]
    project: MaintenanceProject,
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Application(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn print_written(ctx: &AppContext, doc: &DocumentRef) -> AppResult<()> {
    print_json(&json!({
        "collection": doc.collection,
        "id": doc.id,
        "writtenAt": timestamp(ctx.clock.now()),
    }))
}

/// Waits for the projects mirror to settle and surfaces its error, if any.
async fn mirrored_projects(ctx: &AppContext) -> AppResult<Vec<MaintenanceProject>> {
    let state = ctx
        .maint_projects
        .wait_for(|s| !s.loading && (s.data.is_some() || s.error.is_some()))
        .await;
    match state.error {
        Some(err) => Err(err.into()),
        None => Ok(state.data.unwrap_or_default()),
    }
}

pub async fn run(ctx: &AppContext, matches: &ArgMatches) -> AppResult<()> {
    let user = ctx.auth.current().ok_or(AppError::AuthenticationRequired)?;

    match matches.subcommand() {
        Some(("projects", projects)) => run_projects(ctx, projects, &user).await,
        Some(("docs", docs)) => run_docs(ctx, docs).await,
        _ => Err(AppError::Application("Unknown command".to_string())),
    }
}

async fn run_projects(ctx: &AppContext, matches: &ArgMatches, user: &Person) -> AppResult<()> {
    let service = ctx.maint_projects_service();
    let data = mirrored_projects(ctx).await?;

    match matches.subcommand() {
        Some(("list", list)) => {
            let mut projects = data;
            if let Some(statuses) = list.get_many::<String>("status") {
                let statuses = statuses
                    .map(|s| s.parse::<ProjectStatus>())
                    .collect::<DomainResult<Vec<_>>>()?;
                projects = service.get_by_status(statuses, Some(&projects));
            }

            projects = match list.get_one::<String>("sort").map(String::as_str) {
                Some("status") => {
                    let order = match list.get_many::<String>("order") {
                        Some(order) => order
                            .map(|s| s.parse::<ProjectStatus>())
                            .collect::<DomainResult<Vec<_>>>()?,
                        None => DEFAULT_STATUS_ORDER.to_vec(),
                    };
                    service.sort_by_status(&order, Some(&projects))
                }
                Some("priority") => service.sort_by_priority(Some(&projects)),
                _ => projects,
            };

            let views: Vec<ProjectView> = projects
                .into_iter()
                .map(|project| view(&service, project))
                .collect();
            print_json(&views)
        }
        Some(("get", get)) => {
            let project = find(&service, get)?;
            print_json(&view(&service, project))
        }
        Some(("add", add)) => {
            let draft = ProjectDraft {
                title: string_arg(add, "title").unwrap_or_default(),
                description: string_arg(add, "description").unwrap_or_default(),
                requester: string_arg(add, "requester")
                    .map(Person)
                    .unwrap_or_else(|| user.clone()),
                team: string_arg(add, "team"),
                priority: priority_arg(add)?.unwrap_or(Priority::Medium),
                eta: eta_arg(add)?.ok_or_else(|| DomainError::MissingField("eta".to_string()))?,
                is_pred_prev: add.get_one::<bool>("pred-prev").copied().unwrap_or(false),
                author: user.clone(),
            };
            draft.validate()?;

            // the first project of a collection starts the numbering
            let internal_id = service.get_next_internal_id().unwrap_or(1);
            let doc = service.add(internal_id, &draft).await?;
            print_written(ctx, &doc)
        }
        Some(("update", update)) => {
            let current = find(&service, update)?;
            let mut draft = ProjectDraft::from_project(&current, user.clone());
            if let Some(title) = string_arg(update, "title") {
                draft.title = title;
            }
            if let Some(description) = string_arg(update, "description") {
                draft.description = description;
            }
            if let Some(requester) = string_arg(update, "requester") {
                draft.requester = Person(requester);
            }
            if let Some(team) = string_arg(update, "team") {
                draft.team = Some(team);
            }
            if let Some(priority) = priority_arg(update)? {
                draft.priority = priority;
            }
            if let Some(eta) = eta_arg(update)? {
                draft.eta = eta;
            }
            if let Some(pred_prev) = update.get_one::<bool>("pred-prev") {
                draft.is_pred_prev = *pred_prev;
            }
            draft.validate()?;

            let doc = service
                .update(&current.id, current.internal_id, &draft)
                .await?;
            print_written(ctx, &doc)
        }
        Some(("status", status)) => {
            let id = id_arg(status);
            let message = string_arg(status, "message")
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| DomainError::MissingField("message".to_string()))?;
            let doc = service.share_project_status(&id, user, &message).await?;
            print_written(ctx, &doc)
        }
        Some(("deliver", deliver)) => {
            let id = id_arg(deliver);
            let message = string_arg(deliver, "message");
            let doc = service
                .deliver_project(&id, user, message.as_deref())
                .await?;
            print_written(ctx, &doc)
        }
        Some(("summary", _)) => {
            let groups = service.map_by_status(Some(&data));
            let counts: serde_json::Map<String, serde_json::Value> = ProjectStatus::ALL
                .iter()
                .map(|status| (status.to_string(), json!(groups.get(*status).len())))
                .collect();
            print_json(&counts)
        }
        Some(("export", _)) => {
            let sorted = service.sort_by_status(&DEFAULT_STATUS_ORDER, Some(&data));
            println!("{}", projects_report(&sorted, ctx.clock.now()));
            Ok(())
        }
        _ => Err(AppError::Application("Unknown projects subcommand".to_string())),
    }
}

async fn run_docs(ctx: &AppContext, matches: &ArgMatches) -> AppResult<()> {
    match matches.subcommand() {
        Some(("list", _)) => {
            let state = ctx
                .std_docs
                .wait_for(|s| !s.loading && (s.data.is_some() || s.error.is_some()))
                .await;
            if let Some(err) = state.error {
                return Err(err.into());
            }
            let now = ctx.clock.now();
            let views: Vec<StdDocumentView> = state
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|document| StdDocumentView {
                    revision_due: document.is_revision_due(now),
                    document,
                })
                .collect();
            print_json(&views)
        }
        _ => Err(AppError::Application("Unknown docs subcommand".to_string())),
    }
}

fn view(service: &MaintProjectService, project: MaintenanceProject) -> ProjectView {
    ProjectView {
        code: service.format_internal_id(project.internal_id),
        status: service.get_project_status(&project),
        project,
    }
}

fn string_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn id_arg(matches: &ArgMatches) -> ProjectId {
    string_arg(matches, "id").map(ProjectId).unwrap_or_default()
}

fn find(service: &MaintProjectService, matches: &ArgMatches) -> AppResult<MaintenanceProject> {
    let id = id_arg(matches);
    service
        .get_by_id(&id)
        .ok_or(AppError::ProjectNotFound(id.0))
}

fn priority_arg(matches: &ArgMatches) -> DomainResult<Option<Priority>> {
    string_arg(matches, "priority")
        .map(|p| p.parse::<Priority>())
        .transpose()
}

fn eta_arg(matches: &ArgMatches) -> DomainResult<Option<chrono::DateTime<chrono::Utc>>> {
    string_arg(matches, "eta")
        .map(|eta| parse_due_date(&eta))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build().debug_assert();
    }

    #[test]
    fn test_parse_add_command() {
        let matches = build()
            .try_get_matches_from([
                "maint", "--user", "ana", "projects", "add", "--title", "Fix roof", "--eta",
                "2023-07-01", "--pred-prev",
            ])
            .unwrap();
        let (_, projects) = matches.subcommand().unwrap();
        let (name, add) = projects.subcommand().unwrap();
        assert_eq!(name, "add");
        assert_eq!(string_arg(add, "title").as_deref(), Some("Fix roof"));
        assert_eq!(add.get_one::<bool>("pred-prev"), Some(&true));
        assert!(eta_arg(add).unwrap().is_some());
        assert_eq!(matches.get_one::<String>("user").map(String::as_str), Some("ana"));
    }

    #[test]
    fn test_add_requires_title_and_eta() {
        assert!(build()
            .try_get_matches_from(["maint", "projects", "add", "--title", "x"])
            .is_err());
    }

    fn saved_config() -> AppConfig {
        AppConfig {
            environment: Environment::Production,
            store_path: None,
            current_user: Some(Person::from("ana")),
        }
    }

    #[test]
    fn test_environment_variables_override_saved_config() {
        let matches = build()
            .try_get_matches_from(["maint", "docs", "list"])
            .unwrap();
        let mut config = saved_config();

        apply_overrides(&mut config, &matches, |name| match name {
            "MAINT_USER" => Some("bia".to_string()),
            "MAINT_ENV" => Some("test".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.current_user, Some(Person::from("bia")));
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_flags_override_environment_variables() {
        let matches = build()
            .try_get_matches_from([
                "maint", "--user", "carla", "--env", "dev", "--store", "/tmp/s.json", "docs",
                "list",
            ])
            .unwrap();
        let mut config = saved_config();

        apply_overrides(&mut config, &matches, |name| match name {
            "MAINT_USER" => Some("bia".to_string()),
            "MAINT_ENV" => Some("production".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.current_user, Some(Person::from("carla")));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn test_saved_config_kept_without_overrides() {
        let matches = build()
            .try_get_matches_from(["maint", "docs", "list"])
            .unwrap();
        let mut config = saved_config();

        apply_overrides(&mut config, &matches, |_| None).unwrap();
        assert_eq!(config, saved_config());

        let err = apply_overrides(&mut config, &matches, |name| {
            (name == "MAINT_ENV").then(|| "staging".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidEnvironment(_)));
    }

    #[test]
    fn test_list_order_is_comma_separated() {
        let matches = build()
            .try_get_matches_from([
                "maint", "projects", "list", "--sort", "status", "--order", "finished,late",
            ])
            .unwrap();
        let (_, projects) = matches.subcommand().unwrap();
        let (_, list) = projects.subcommand().unwrap();
        let order: Vec<&String> = list.get_many::<String>("order").unwrap().collect();
        assert_eq!(order, vec!["finished", "late"]);
    }
}
