use chrono::{DateTime, Utc};

use super::datetime::timestamp_to_str;
use super::MaintenanceProject;

const ACCENTED: &str = "ÀÁÂÃÄÅÆÇÈÉÊËÌÍÎÏÐÑÒÓÔÕÖØÙÚÛÜÝŔÞßàáâãäåæçèéêëìíîïðñòóôõöøùúûüýþÿŕ";
const FOLDED: &str = "AAAAAAACEEEEIIIIDNOOOOOOUUUUYRsBaaaaaaaceeeeiiiionoooooouuuuybyr";

/// Folds accented Latin-1 letters to plain ASCII so exported CSVs open
/// cleanly in spreadsheet tools with legacy encodings.
pub fn remove_special_chars(s: &str) -> String {
    s.chars()
        .map(|c| {
            ACCENTED
                .chars()
                .position(|special| special == c)
                .and_then(|idx| FOLDED.chars().nth(idx))
                .unwrap_or(c)
        })
        .collect()
}

fn csv_cell(cell: &str) -> String {
    let mut safe = remove_special_chars(cell);
    if safe.contains(',') || safe.contains('\n') {
        if safe.contains('"') {
            safe = safe.replacen('"', "\\\"", 1);
        }
        safe = format!("\"{safe}\"");
    }
    safe.trim().to_string()
}

pub fn prepare_csv_data<C: AsRef<str>>(rows: &[Vec<C>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| csv_cell(cell.as_ref()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn projects_report(projects: &[MaintenanceProject], now: DateTime<Utc>) -> String {
    let mut rows = vec![vec![
        "ID".to_string(),
        "Titulo".to_string(),
        "Solicitante".to_string(),
        "Prioridade".to_string(),
        "Status".to_string(),
        "Previsao".to_string(),
    ]];

    rows.extend(projects.iter().map(|project| {
        vec![
            project.code(),
            project.title.clone(),
            project.requester.to_string(),
            project.priority.to_string(),
            project.status_at(now).to_string(),
            timestamp_to_str(project.eta, false),
        ]
    }));

    prepare_csv_data(&rows)
}
