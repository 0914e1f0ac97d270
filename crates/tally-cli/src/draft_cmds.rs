//! CLI handlers for `tally draft` subcommands.
//!
//! The draft lives in the file store under the configured key, so the CLI and
//! any other client sharing the directory see the same wizard state.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use tally_core::draft::{FileDraftStore, PlanDraft};
use tally_core::notify::{self, Notice};
use tally_core::plan::create_plan;
use tally_core::wizard::{PlanWizard, Stage};
use tally_db::pool;

use crate::DraftCommands;
use crate::config::TallyConfig;

pub async fn run_draft_command(command: DraftCommands, cfg: &TallyConfig) -> Result<()> {
    let store = Arc::new(FileDraftStore::new(&cfg.drafts_dir));
    let mut wizard = PlanWizard::open(store, &cfg.draft_key)?;

    match command {
        DraftCommands::Show => print!("{}", render_status(&wizard)?),
        DraftCommands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read draft file {file}"))?;
            cmd_import(&mut wizard, &raw)?;
            println!("Draft imported from {file}.");
        }
        DraftCommands::Set { json } => {
            cmd_set(&mut wizard, &json)?;
            println!("Draft updated. Monthly price: {:.2}", wizard.total_price());
        }
        DraftCommands::Next => {
            let report = wizard.next()?;
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!("Now at {}.", wizard.current_stage());
        }
        DraftCommands::Prev => {
            let stage = wizard.prev()?;
            println!("Now at {stage}.");
        }
        DraftCommands::Goto { stage } => {
            cmd_goto(&mut wizard, &stage)?;
            println!("Now at {}.", wizard.current_stage());
        }
        DraftCommands::Submit => cmd_submit(&mut wizard, cfg).await?,
        DraftCommands::Clear => {
            wizard.clear()?;
            println!("Draft cleared.");
        }
    }
    Ok(())
}

fn render_status(wizard: &PlanWizard) -> Result<String> {
    let stage = wizard.current_stage();
    let completed: Vec<&str> = wizard.completed().map(Stage::as_str).collect();
    let mut out = format!(
        "Stage:     {stage} ({}/{})\n",
        stage.index() + 1,
        Stage::ALL.len()
    );
    out.push_str(&format!(
        "Completed: {}\n",
        if completed.is_empty() {
            "-".to_string()
        } else {
            completed.join(", ")
        }
    ));
    out.push_str(&format!("Price:     {:.2}/month\n", wizard.total_price()));
    out.push_str(&serde_json::to_string_pretty(wizard.draft())?);
    out.push('\n');
    Ok(out)
}

fn cmd_import(wizard: &mut PlanWizard, raw: &str) -> Result<()> {
    let draft: PlanDraft = serde_json::from_str(raw).context("draft file is not a valid plan draft")?;
    wizard.update(|d| *d = draft)?;
    Ok(())
}

fn cmd_set(wizard: &mut PlanWizard, patch: &str) -> Result<()> {
    let patched = apply_patch(wizard.draft(), patch)?;
    wizard.update(|d| *d = patched)?;
    Ok(())
}

fn cmd_goto(wizard: &mut PlanWizard, stage: &str) -> Result<()> {
    let target: Stage = stage.parse()?;
    wizard.jump(target)?;
    Ok(())
}

async fn cmd_submit(wizard: &mut PlanWizard, cfg: &TallyConfig) -> Result<()> {
    let submission = wizard.submission()?;

    let db_pool = pool::create_pool(&cfg.db_config).await?;
    let result = create_plan(&db_pool, &submission).await;
    db_pool.close().await;
    let plan = result?;

    let notifier = crate::build_notifier(cfg)?;
    let notified = notify::deliver(notifier.as_ref(), &Notice::plan_created(&plan)).await;

    wizard.clear()?;
    println!("Plan created: {} ({:.2}/month)", plan.id, plan.total_price);
    if !notified {
        println!("  (no notification sent)");
    }
    Ok(())
}

/// Apply a JSON merge patch to the draft's camelCase form.
fn apply_patch(draft: &PlanDraft, patch: &str) -> Result<PlanDraft> {
    let patch: Value = serde_json::from_str(patch).context("patch is not valid JSON")?;
    if !patch.is_object() {
        bail!("patch must be a JSON object");
    }
    let mut value = serde_json::to_value(draft)?;
    merge_patch(&mut value, patch);
    serde_json::from_value(value).context("patched draft does not match the plan draft shape")
}

/// Objects merge key by key, `null` deletes, anything else replaces.
fn merge_patch(target: &mut Value, patch: Value) {
    let Value::Object(entries) = patch else {
        *target = patch;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(obj) = target {
        for (key, value) in entries {
            if value.is_null() {
                obj.remove(&key);
            } else {
                merge_patch(obj.entry(key).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tally_core::draft::{DRAFT_KEY, DraftStore, MemoryDraftStore};
    use tally_core::wizard::WizardError;

    use super::*;

    fn wizard() -> PlanWizard {
        let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
        PlanWizard::open(store, DRAFT_KEY).unwrap()
    }

    #[test]
    fn merge_patch_merges_nested_and_deletes_null() {
        let mut target = json!({ "a": { "b": 1, "c": 2 }, "d": [1, 2] });
        merge_patch(&mut target, json!({ "a": { "c": null, "e": 3 }, "d": [9] }));
        assert_eq!(target, json!({ "a": { "b": 1, "e": 3 }, "d": [9] }));
    }

    #[test]
    fn set_updates_one_field_and_keeps_the_rest() {
        let mut wizard = wizard();
        cmd_set(&mut wizard, r#"{"basic":{"planName":"FY27 finance office"}}"#).unwrap();
        cmd_set(&mut wizard, r#"{"governance":{"escalationContact":"cfo@pawnee.test"}}"#).unwrap();
        assert_eq!(wizard.draft().basic.plan_name, "FY27 finance office");
        assert_eq!(wizard.draft().governance.escalation_contact, "cfo@pawnee.test");
        assert_eq!(wizard.version(), Some(2));
    }

    #[test]
    fn set_rejects_bad_patches_without_saving() {
        let mut wizard = wizard();
        assert!(cmd_set(&mut wizard, "[1, 2]").is_err());
        assert!(cmd_set(&mut wizard, "{not json").is_err());
        assert!(cmd_set(&mut wizard, r#"{"kpis":"lots"}"#).is_err());
        assert_eq!(wizard.version(), None);
    }

    #[test]
    fn import_assigns_item_ids() {
        let mut wizard = wizard();
        let raw = json!({
            "basic": { "planName": "Imported" },
            "milestones": [
                { "sequence": 1, "name": "Close", "durationWeeks": 4, "budgetPercent": 100.0, "owner": "HQ" }
            ]
        })
        .to_string();
        cmd_import(&mut wizard, &raw).unwrap();
        assert_eq!(wizard.draft().basic.plan_name, "Imported");
        assert!(wizard.draft().milestones[0].id.is_some());
    }

    #[test]
    fn goto_parses_and_enforces_order() {
        let mut wizard = wizard();
        let err = cmd_goto(&mut wizard, "upsell").unwrap_err();
        assert!(err.to_string().contains("unknown wizard stage"));

        let err = cmd_goto(&mut wizard, "pricing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WizardError>(),
            Some(WizardError::JumpBlocked { .. })
        ));
        cmd_goto(&mut wizard, "basic").unwrap();
    }

    #[test]
    fn status_shows_stage_and_price() {
        let wizard = wizard();
        let status = render_status(&wizard).unwrap();
        assert!(status.starts_with("Stage:     basic (1/8)\n"));
        assert!(status.contains("Completed: -"));
        assert!(status.contains("\"planName\""));
    }
}
