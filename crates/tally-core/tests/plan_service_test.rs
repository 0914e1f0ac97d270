//! Integration tests for plan submission against a real PostgreSQL database.
//! Each test creates an isolated temporary database.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use tally_core::draft::{
    AssignmentItem, Cadence, KpiItem, MilestoneItem, PlanDraft, Thresholds,
};
use tally_core::plan::{PlanError, PlanSubmission, create_plan, get_plan_detail};
use tally_core::pricing::{AddOn, BillingCycle, Package};
use tally_db::models::{AssignmentType, DataDomain, ErpType, MilestoneOwner, PlanStatus, Priority};
use tally_db::queries::customers::{self, NewCustomer};
use tally_test_utils::{create_test_db, drop_test_db};

async fn seed_customer(pool: &PgPool) -> Uuid {
    customers::insert_customer(
        pool,
        &NewCustomer {
            name: "Dana Whitfield".to_string(),
            email: "dana@initech.test".to_string(),
            company: "Initech".to_string(),
            phone: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn draft_for(customer_id: Uuid) -> PlanDraft {
    let mut draft = PlanDraft::default();
    draft.basic.plan_name = "Initech FY27 finance build-out".into();
    draft.basic.client_id = Some(customer_id);
    draft.basic.start_date = NaiveDate::from_ymd_opt(2026, 11, 2);
    draft.erp.erp_type = ErpType::Odoo;
    draft.erp.data_domains = vec![DataDomain::Invoices, DataDomain::GeneralLedger];
    draft.milestones = vec![
        MilestoneItem {
            id: None,
            sequence: 2,
            name: "monthly close in 5 days".into(),
            duration_weeks: 8,
            budget_percent: 60.0,
            critical_path: true,
            owner: MilestoneOwner::Hq,
        },
        MilestoneItem {
            id: None,
            sequence: 1,
            name: "chart of accounts cleanup".into(),
            duration_weeks: 3,
            budget_percent: 40.0,
            critical_path: false,
            owner: MilestoneOwner::Client,
        },
    ];
    draft.kpis = vec![
        KpiItem {
            id: None,
            kpi_code: "FIN.EBITDA%".into(),
            target_value: 15.0,
            thresholds: Thresholds { green: 15.0, amber: 10.0, red: 5.0 },
            weight: 70.0,
        },
        KpiItem {
            id: None,
            kpi_code: "FIN.DSO".into(),
            target_value: 45.0,
            thresholds: Thresholds { green: 45.0, amber: 60.0, red: 75.0 },
            weight: 30.0,
        },
    ];
    draft.assignments = vec![AssignmentItem {
        id: None,
        assignment_type: AssignmentType::Hq,
        partner_id: None,
        sla_hours: 48,
        due_date: NaiveDate::from_ymd_opt(2026, 12, 1),
        priority: Priority::High,
    }];
    draft.governance.steering_cadence = Some(Cadence::Monthly);
    draft.governance.reporting_frequency = Some(Cadence::Biweekly);
    draft.governance.escalation_contact = "cfo@initech.test".into();
    draft.pricing.package = Some(Package::Growth);
    draft.pricing.add_ons = vec![AddOn::FpaModeling];
    draft.pricing.billing_cycle = Some(BillingCycle::Monthly);
    draft
}

#[tokio::test]
async fn create_plan_persists_children_in_order() {
    let (pool, db_name) = create_test_db().await;
    let customer_id = seed_customer(&pool).await;

    let submission = PlanSubmission::from_draft(draft_for(customer_id));
    let plan = create_plan(&pool, &submission).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Draft);
    assert_eq!(plan.total_price, 6_200.0);
    assert_eq!(plan.package, "GROWTH");
    assert_eq!(plan.add_ons, vec!["FPA_MODELING".to_string()]);
    assert_eq!(plan.data_domains, vec!["INVOICES".to_string(), "GENERAL_LEDGER".to_string()]);
    assert_eq!(plan.governance["escalationContact"], "cfo@initech.test");

    let detail = get_plan_detail(&pool, plan.id).await.unwrap().expect("plan exists");
    let names: Vec<&str> = detail.milestones.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["monthly close in 5 days", "chart of accounts cleanup"]);
    assert_eq!(detail.milestones[0].sequence, 2, "entry order, not sequence order");
    let codes: Vec<&str> = detail.kpis.iter().map(|k| k.kpi_code.as_str()).collect();
    assert_eq!(codes, ["FIN.EBITDA%", "FIN.DSO"]);
    assert_eq!(detail.assignments.len(), 1);
    assert_eq!(detail.assignments[0].sla_hours, 48);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn submitted_price_is_recomputed() {
    let (pool, db_name) = create_test_db().await;
    let customer_id = seed_customer(&pool).await;

    let mut submission = PlanSubmission::from_draft(draft_for(customer_id));
    submission.total_price = 1.0;
    let plan = create_plan(&pool, &submission).await.unwrap();
    assert_eq!(plan.total_price, 6_200.0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn resubmitting_a_reconciled_draft_creates_a_second_plan() {
    let (pool, db_name) = create_test_db().await;
    let customer_id = seed_customer(&pool).await;

    let mut draft = draft_for(customer_id);
    draft.reconcile();
    let draft_ids: Vec<Uuid> = draft.milestones.iter().filter_map(|m| m.id).collect();
    let submission = PlanSubmission::from_draft(draft);

    let first = create_plan(&pool, &submission).await.unwrap();
    let second = create_plan(&pool, &submission).await.unwrap();
    assert_ne!(first.id, second.id);

    let detail = get_plan_detail(&pool, second.id).await.unwrap().expect("plan exists");
    assert_eq!(detail.milestones.len(), 2);
    assert_eq!(detail.kpis.len(), 2);
    assert_eq!(detail.assignments.len(), 1);
    assert!(detail.milestones.iter().all(|m| !draft_ids.contains(&m.id)));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn invalid_submission_writes_nothing() {
    let (pool, db_name) = create_test_db().await;
    let customer_id = seed_customer(&pool).await;

    let mut draft = draft_for(customer_id);
    draft.milestones[0].budget_percent = 59.0;
    let err = create_plan(&pool, &PlanSubmission::from_draft(draft)).await.unwrap_err();
    assert!(matches!(err, PlanError::Validation(_)));
    assert!(err.to_string().contains("budget percentages must sum to 100"));

    let plans = tally_db::queries::plans::list_plans(&pool, None).await.unwrap();
    assert!(plans.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let (pool, db_name) = create_test_db().await;

    let missing = Uuid::new_v4();
    let err = create_plan(&pool, &PlanSubmission::from_draft(draft_for(missing)))
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::CustomerNotFound(id) if id == missing));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn missing_plan_detail_is_none() {
    let (pool, db_name) = create_test_db().await;
    assert!(get_plan_detail(&pool, Uuid::new_v4()).await.unwrap().is_none());
    pool.close().await;
    drop_test_db(&db_name).await;
}
