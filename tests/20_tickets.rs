mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{notice, TestApp};

#[tokio::test]
async fn import_creates_ticket_and_queues_processing() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.coordinator().await?;

    let res = app
        .post("/api/tickets/import", &token, json!({ "source": "811", "payload": notice() }))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["ticketNumber"], "TX-811-2025-20001");

    let ticket_id = res.data()["ticketId"].as_str().unwrap_or_default().to_string();
    let job = app.finished_job(res.data()["jobId"].as_str().unwrap_or_default()).await?;
    assert_eq!(job.name, "process-ticket");
    assert_eq!(job.payload["ticketId"], ticket_id.as_str());

    let res = app.get(&format!("/api/tickets/{}", ticket_id), &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    let ticket = &res.data()["ticket"];
    assert_eq!(ticket["status"], "INTAKE");
    assert_eq!(ticket["workAddress"], "900 Red River St, Austin, TX 78701");
    assert_eq!(ticket["utilityTypes"], json!(["FIBER", "ELECTRIC"]));
    assert_eq!(ticket["excavatorName"], "Capital Fiber Builders");
    Ok(())
}

#[tokio::test]
async fn import_generates_a_number_when_missing() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.coordinator().await?;

    let mut payload = notice();
    if let Some(fields) = payload.as_object_mut() {
        fields.remove("ticketNumber");
    }

    let res = app
        .post("/api/tickets/import", &token, json!({ "payload": payload }))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.data()["ticketNumber"].as_str().is_some_and(|n| n.starts_with("TX811-")));
    Ok(())
}

#[tokio::test]
async fn import_rejects_invalid_notice_with_details() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.coordinator().await?;

    let res = app
        .post(
            "/api/tickets/import",
            &token,
            json!({
                "payload": {
                    "workStartDate": "2025-05-10",
                    "workEndDate": "2025-05-01",
                    "utilityTypes": ["plasma"]
                }
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let details: Vec<&str> = res.body["details"]
        .as_array()
        .map(|d| d.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    assert!(details.contains(&"Excavator company is required"));
    assert!(details.contains(&"Work address is required"));
    assert!(details.contains(&"At least one recognized utility type is required"));
    assert!(details.contains(&"Work start date must be before end date"));
    Ok(())
}

#[tokio::test]
async fn import_rejects_duplicate_ticket_number() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.coordinator().await?;

    let mut payload = notice();
    payload["ticketNumber"] = json!("TX-811-2025-12345");

    let res = app
        .post("/api/tickets/import", &token, json!({ "payload": payload }))
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn import_is_coordinator_only() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.supervisor().await?;

    let res = app
        .post("/api/tickets/import", &token, json!({ "payload": notice() }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn list_is_newest_first_with_relations() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.supervisor().await?;

    let res = app.get("/api/tickets", &token).await?;
    assert_eq!(res.status, StatusCode::OK);

    let tickets = res.data()["tickets"].as_array().cloned().unwrap_or_default();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0]["id"], app.demo.water_ticket_id.to_string());
    assert_eq!(tickets[1]["id"], app.demo.fiber_ticket_id.to_string());

    let fiber = &tickets[1];
    assert_eq!(fiber["permits"][0]["status"], "APPROVED");
    assert_eq!(fiber["inspections"][0]["status"], "SCHEDULED");
    assert_eq!(fiber["counts"]["evidence"], 1);
    assert_eq!(fiber["counts"]["fees"], 1);

    let pagination = &res.data()["pagination"];
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["total"], 2);
    assert_eq!(pagination["totalPages"], 1);
    Ok(())
}

#[tokio::test]
async fn list_filters_and_pages() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.coordinator().await?;

    let res = app.get("/api/tickets?status=PERMIT_FILED", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    let tickets = res.data()["tickets"].as_array().cloned().unwrap_or_default();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["ticketNumber"], "TX-811-2025-12345");

    let res = app.get("/api/tickets?page=2&limit=1", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["tickets"][0]["id"], app.demo.fiber_ticket_id.to_string());
    assert_eq!(res.data()["pagination"]["totalPages"], 2);

    let res = app.get("/api/tickets?page=3&limit=1", &token).await?;
    assert_eq!(res.data()["tickets"].as_array().map(Vec::len), Some(0));

    let res = app.get("/api/tickets?status=ARCHIVED", &token).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/tickets?page=0", &token).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    for limit in ["0", "101", "500"] {
        let res = app.get(&format!("/api/tickets?limit={}", limit), &token).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "limit={}", limit);
        assert_eq!(res.body["code"], "BAD_REQUEST");
    }

    let res = app.get("/api/tickets?limit=100", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["pagination"]["limit"], 100);
    Ok(())
}

#[tokio::test]
async fn detail_includes_every_related_record() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.supervisor().await?;

    let res = app
        .get(&format!("/api/tickets/{}", app.demo.fiber_ticket_id), &token)
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let ticket = &res.data()["ticket"];
    assert_eq!(ticket["permits"][0]["permitNumber"], "AUSTIN-2025-001");
    assert_eq!(ticket["permits"][0]["fee"], "75.00");
    assert_eq!(ticket["trafficPlans"].as_array().map(Vec::len), Some(1));
    assert_eq!(ticket["inspections"].as_array().map(Vec::len), Some(1));
    assert_eq!(ticket["evidence"].as_array().map(Vec::len), Some(1));
    assert_eq!(ticket["fees"][0]["status"], "PAID");
    Ok(())
}

#[tokio::test]
async fn detail_of_unknown_or_malformed_id() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.supervisor().await?;

    let res = app
        .get(&format!("/api/tickets/{}", uuid::Uuid::new_v4()), &token)
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "Ticket not found");

    let res = app.get("/api/tickets/not-a-uuid", &token).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn status_update_is_audited_and_role_gated() -> Result<()> {
    let app = TestApp::spawn().await?;
    let uri = format!("/api/tickets/{}/status", app.demo.water_ticket_id);

    let supervisor = app.supervisor().await?;
    let res = app.patch(&uri, &supervisor, json!({ "status": "FIELD_WORK" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let manager = app.manager().await?;
    let res = app.patch(&uri, &manager, json!({ "status": "BOGUS" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.patch(&uri, &manager, json!({ "status": "FIELD_WORK" })).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["ticket"]["status"], "FIELD_WORK");

    let res = app
        .get(&format!("/api/audit/{}", app.demo.water_ticket_id), &manager)
        .await?;
    let latest = &res.data()["auditLogs"][0];
    assert_eq!(latest["action"], "STATUS_UPDATED");
    assert_eq!(latest["previousData"]["status"], "INTAKE");
    assert_eq!(latest["newData"]["status"], "FIELD_WORK");
    assert_eq!(latest["user"]["email"], common::MANAGER_EMAIL);
    assert_eq!(latest["ipAddress"], "198.51.100.20");
    Ok(())
}

#[tokio::test]
async fn dashboard_counts_open_work() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.supervisor().await?;

    let res = app.get("/api/tickets/dashboard/summary", &token).await?;
    assert_eq!(res.status, StatusCode::OK);
    let summary = res.data();
    assert_eq!(summary["ticketsPending"], 2);
    assert_eq!(summary["permitsAwaitingApproval"], 0);
    assert_eq!(summary["feesOutstanding"], 0);
    assert_eq!(summary["recentTickets"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn prefill_permit_is_queued() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.coordinator().await?;
    let uri = format!("/api/tickets/{}/prefill-permit", app.demo.water_ticket_id);

    let res = app.post(&uri, &token, json!({ "municipality": "" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"].as_array().map(Vec::len), Some(2));

    let res = app
        .post(
            &uri,
            &token,
            json!({ "municipality": "City of Austin", "permitType": "Right-of-Way Excavation" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert_eq!(res.data()["message"], "Permit prefill queued");

    let job = app.finished_job(res.data()["jobId"].as_str().unwrap_or_default()).await?;
    assert_eq!(job.name, "prefill-permit");
    assert_eq!(job.payload["municipality"], "City of Austin");
    Ok(())
}
