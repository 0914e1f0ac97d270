//! End-to-end wizard workflow: a draft saved to disk, resumed, walked to
//! review, and submitted as a plan against a real PostgreSQL database.

use std::sync::Arc;

use serde_json::json;

use tally_core::draft::{DraftStore, FileDraftStore, PlanDraft};
use tally_core::plan::{create_plan, get_plan_detail};
use tally_core::wizard::{PlanWizard, Stage, WizardError};
use tally_db::queries::customers::{self, NewCustomer};
use tally_test_utils::{create_test_db, drop_test_db};

const KEY: &str = "planBuilderDraft";

fn draft_json(customer_id: uuid::Uuid) -> serde_json::Value {
    json!({
        "basic": {
            "planName": "Pawnee parks finance office",
            "clientId": customer_id,
            "startDate": "2026-11-02"
        },
        "erp": { "erpType": "ODOO", "dataDomains": ["INVOICES", "BILLS"] },
        "kpis": [
            { "kpiCode": "FIN.EBITDA%", "targetValue": 18.0, "thresholds": { "green": 18.0, "amber": 12.0, "red": 8.0 }, "weight": 70.0 },
            { "kpiCode": "FIN.DSO", "targetValue": 45.0, "weight": 30.0 }
        ],
        "milestones": [
            { "sequence": 1, "name": "books catch-up", "durationWeeks": 6, "budgetPercent": 55.0, "owner": "HQ" },
            { "sequence": 2, "name": "budget model", "durationWeeks": 4, "budgetPercent": 45.0, "criticalPath": true, "owner": "CLIENT" }
        ],
        "assignments": [
            { "type": "HQ", "slaHours": 48, "priority": "HIGH" }
        ],
        "governance": {
            "steeringCadence": "MONTHLY",
            "reportingFrequency": "WEEKLY",
            "escalationContact": "ron@pawnee.test"
        },
        "pricing": { "package": "ESSENTIALS", "addOns": ["TAX_ADVISORY"], "billingCycle": "MONTHLY" }
    })
}

#[tokio::test]
async fn draft_on_disk_resumes_and_submits() {
    let (pool, db_name) = create_test_db().await;
    let dir = tempfile::tempdir().unwrap();

    let customer = customers::insert_customer(
        &pool,
        &NewCustomer {
            name: "Leslie Knope".into(),
            email: "leslie@pawnee.test".into(),
            company: "Pawnee Parks".into(),
            phone: None,
        },
    )
    .await
    .unwrap();

    let draft: PlanDraft = serde_json::from_value(draft_json(customer.id)).unwrap();
    {
        let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::new(dir.path()));
        let mut wizard = PlanWizard::open(store, KEY).unwrap();
        wizard.update(|d| *d = draft).unwrap();
        for _ in 0..3 {
            wizard.next().unwrap();
        }
        assert_eq!(wizard.current_stage(), Stage::Milestones);
    }

    // A second process picks up the same file.
    let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::new(dir.path()));
    let mut wizard = PlanWizard::open(store.clone(), KEY).unwrap();
    assert_eq!(wizard.current_stage(), Stage::Milestones);
    assert!(wizard.is_completed(Stage::Kpis));
    assert!(matches!(
        wizard.jump(Stage::Review),
        Err(WizardError::JumpBlocked { .. })
    ));

    while wizard.current_stage() != Stage::Review {
        wizard.next().unwrap();
    }
    assert_eq!(wizard.total_price(), 3_400.0);

    let submission = wizard.submission().unwrap();
    let plan = create_plan(&pool, &submission).await.unwrap();
    assert_eq!(plan.customer_id, customer.id);
    assert_eq!(plan.total_price, 3_400.0);
    assert_eq!(plan.add_ons, vec!["TAX_ADVISORY".to_string()]);

    let detail = get_plan_detail(&pool, plan.id).await.unwrap().unwrap();
    assert_eq!(detail.milestones.len(), 2);
    assert_eq!(detail.kpis.len(), 2);
    assert_eq!(detail.assignments.len(), 1);

    wizard.clear().unwrap();
    assert!(store.load(KEY).unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[test]
fn unfinished_draft_cannot_be_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::new(dir.path()));
    let mut wizard = PlanWizard::open(store, KEY).unwrap();

    let mut value = draft_json(uuid::Uuid::new_v4());
    value["kpis"][1]["weight"] = json!(20.0);
    let draft: PlanDraft = serde_json::from_value(value).unwrap();
    wizard.update(|d| *d = draft).unwrap();

    let err = wizard.submission().unwrap_err();
    assert_eq!(
        err.to_string(),
        "kpis: weights must sum to 100 (currently 90.00)"
    );
}
