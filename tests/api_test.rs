mod helpers;

use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use helpers::{GroupBuilder, LocationBuilder, PersonBuilder, TestApp, UserBuilder};
use linc::authz::AuthorityLevel;
use linc::status::ApplicationStatus;
use linc::storage::{applications, users};
use serde_json::{json, Value};

fn rule_codes(body: &Value) -> Vec<String> {
    body["failures"]
        .as_array()
        .expect("failures array")
        .iter()
        .map(|f| f["rule_code"].as_str().unwrap().to_string())
        .collect()
}

/// National admin, a Western Cape local office with a clerk, and a Gauteng
/// local office with a clerk.
struct World {
    app: TestApp,
    national: i64,
    wc: i64,
    gp: i64,
}

impl World {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let conn = app.conn();
        let national = GroupBuilder::new("NA01", AuthorityLevel::National).create(conn).await;
        let wc = GroupBuilder::new("WC01", AuthorityLevel::Local)
            .province("WC")
            .create(conn)
            .await;
        let gp = GroupBuilder::new("GP01", AuthorityLevel::Local)
            .province("GP")
            .create(conn)
            .await;
        UserBuilder::new("admin", national.id).create(conn).await;
        UserBuilder::new("wc_clerk", wc.id).create(conn).await;
        UserBuilder::new("gp_clerk", gp.id).create(conn).await;
        Self {
            app,
            national: national.id,
            wc: wc.id,
            gp: gp.id,
        }
    }
}

#[tokio::test]
async fn test_healthz() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_unknown_country_is_not_found() {
    let world = World::new().await;
    let token = world.app.login("admin").await;

    // KE exists in the registry but has no database configured here
    for uri in ["/api/v1/ke/persons", "/api/v1/xx/persons", "/api/v1/zaf/persons"] {
        let (status, body) = world.app.get(uri, &token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "unknown_country", "{uri}");
    }

    let (status, body) = world
        .app
        .send(Method::GET, "/api/v1/countries", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["code"], "ZA");
}

#[tokio::test]
async fn test_login_me_logout() {
    let world = World::new().await;

    let (status, body) = world
        .app
        .send(
            Method::POST,
            "/api/v1/za/auth/login",
            None,
            Some(json!({"username": "wc_clerk", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, _) = world
        .app
        .send(Method::GET, "/api/v1/za/auth/me", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = world.app.login("WC_Clerk").await;
    let (status, me) = world.app.get("/api/v1/za/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["username"], "wc_clerk");
    assert!(me["user"].get("password_hash").is_none());
    assert_eq!(me["actor"]["authority_level"], "LOCAL");
    assert_eq!(me["read_scope"]["kind"], "OWN_GROUP");
    assert_eq!(me["country"], "ZA");

    let (status, _) = world
        .app
        .send(Method::POST, "/api/v1/za/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = world.app.get("/api/v1/za/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_out_of_scope_person_reads_as_missing() {
    let world = World::new().await;
    let conn = world.app.conn();
    let gp_person = PersonBuilder::new(world.gp).create(conn).await;

    let wc_token = world.app.login("wc_clerk").await;
    let (status, body) = world
        .app
        .get(&format!("/api/v1/za/persons/{}", gp_person.id), &wc_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not_found"}));

    // indistinguishable from an id that was never used
    let (status, missing) = world.app.get("/api/v1/za/persons/99999", &wc_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing, body);

    let (status, listed) = world.app.get("/api/v1/za/persons", &wc_token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let gp_token = world.app.login("gp_clerk").await;
    let (status, _) = world
        .app
        .get(&format!("/api/v1/za/persons/{}", gp_person.id), &gp_token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let admin = world.app.login("admin").await;
    let (status, listed) = world.app.get("/api/v1/za/persons", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_helpdesk_flag_reads_but_cannot_write() {
    let app = TestApp::new().await;
    let conn = app.conn();
    let helpdesk = GroupBuilder::new("WC09", AuthorityLevel::Local)
        .province("WC")
        .provincial_help_desk()
        .create(conn)
        .await;
    let other_wc = GroupBuilder::new("WC02", AuthorityLevel::Local)
        .province("WC")
        .create(conn)
        .await;
    UserBuilder::new("helper", helpdesk.id).create(conn).await;
    let person = PersonBuilder::new(other_wc.id).create(conn).await;

    let token = app.login("helper").await;
    let uri = format!("/api/v1/za/persons/{}", person.id);
    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.patch(&uri, &token, json!({"surname": "Dlamini"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_person_failures_are_aggregated() {
    let world = World::new().await;
    let token = world.app.login("wc_clerk").await;

    let (status, body) = world
        .app
        .post(
            "/api/v1/za/persons",
            &token,
            json!({
                "id_type": "RSA_ID",
                "id_number": "8001015009088",
                "first_name": "Thabo",
                "gender": "09",
                "email": "not-an-email",
                "postal_code": "20011"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_failed");
    let codes = rule_codes(&body);
    for expected in ["V00019", "V00002", "V00004", "V00008", "V00069"] {
        assert!(codes.contains(&expected.to_string()), "missing {expected} in {codes:?}");
    }

    // dry run reports the same without writing
    let (status, dry) = world
        .app
        .post(
            "/api/v1/za/persons/validate",
            &token,
            json!({"id_type": "RSA_ID", "id_number": "8001015009088"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dry["valid"], false);

    let (_, listed) = world.app.get("/api/v1/za/persons", &token).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_person_create_and_audit() {
    let world = World::new().await;
    let token = world.app.login("wc_clerk").await;

    let (status, person) = world
        .app
        .post(
            "/api/v1/za/persons",
            &token,
            json!({
                "id_type": "RSA_ID",
                "id_number": "8001015009087",
                "first_name": "Thabo",
                "surname": "Mokoena",
                "date_of_birth": "1980-01-01",
                "gender": "01",
                "nationality": "ZA"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{person}");
    assert_eq!(person["validation_status"], "PENDING");
    assert_eq!(person["user_group_id"], world.wc);

    // audit history is NATIONAL only
    let (status, _) = world.app.get("/api/v1/za/audit", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let admin = world.app.login("admin").await;
    let (status, rows) = world
        .app
        .get("/api/v1/za/audit?entity_type=person", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["action"], "CREATE");
    assert_eq!(rows[0]["entity_id"], person["id"].to_string());
}

#[tokio::test]
async fn test_application_lifecycle() {
    let world = World::new().await;
    let conn = world.app.conn();
    let person = PersonBuilder::new(world.wc).create(conn).await;
    let location = LocationBuilder::new("CPT1", world.wc).create(conn).await;
    let token = world.app.login("wc_clerk").await;

    let (status, application) = world
        .app
        .post(
            "/api/v1/za/licenses/applications",
            &token,
            json!({"person_id": person.id, "license_category": "b", "location_id": location.id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{application}");
    assert_eq!(application["status"], "DRAFT");
    assert_eq!(application["license_category"], "B");
    let id = application["id"].as_i64().unwrap();
    let base = format!("/api/v1/za/licenses/applications/{id}");

    let (status, submitted) = world
        .app
        .post(&format!("{base}/transition"), &token, json!({"status": "SUBMITTED"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "SUBMITTED");

    // lifecycle table refuses a jump the rules do not cover
    let (status, body) = world
        .app
        .post(&format!("{base}/transition"), &token, json!({"status": "ISSUED"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // V00491 fires before the lifecycle check
    let (status, body) = world
        .app
        .post(&format!("{base}/transition"), &token, json!({"status": "SUSPENDED"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rule_codes(&body), vec!["V00491"]);
}

#[tokio::test]
async fn test_issued_application_cannot_be_cancelled() {
    let world = World::new().await;
    let conn = world.app.conn();
    let person = PersonBuilder::new(world.wc).create(conn).await;
    let token = world.app.login("wc_clerk").await;

    let (_, application) = world
        .app
        .post(
            "/api/v1/za/licenses/applications",
            &token,
            json!({"person_id": person.id, "license_category": "B"}),
        )
        .await;
    let id = application["id"].as_i64().unwrap();
    let stored = applications::get(conn, id).await.unwrap().unwrap();
    applications::set_status(conn, &stored, ApplicationStatus::Issued)
        .await
        .unwrap();

    let uri = format!("/api/v1/za/licenses/applications/{id}");
    let (status, dry) = world
        .app
        .post(&format!("{uri}/validate"), &token, json!({"status": "CANCELLED"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dry["valid"], false);
    assert_eq!(dry["current"], "ISSUED");

    let (status, body) = world
        .app
        .post(&format!("{uri}/transition"), &token, json!({"status": "CANCELLED"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rule_codes(&body), vec!["V00490"]);

    let (_, unchanged) = world.app.get(&uri, &token).await;
    assert_eq!(unchanged["status"], "ISSUED");
}

#[tokio::test]
async fn test_application_rules_for_applicant() {
    let world = World::new().await;
    let conn = world.app.conn();
    let minor = PersonBuilder::new(world.wc)
        .id_number("0101015009083")
        .born(NaiveDate::from_ymd_opt(2020, 1, 1))
        .create(conn)
        .await;
    let elsewhere = PersonBuilder::new(world.gp).create(conn).await;
    let token = world.app.login("wc_clerk").await;

    let (status, body) = world
        .app
        .post(
            "/api/v1/za/licenses/applications",
            &token,
            json!({"person_id": minor.id, "license_category": "B"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rule_codes(&body), vec!["V00874"]);

    // a person the caller cannot see does not exist as far as the rules care
    let (status, body) = world
        .app
        .post(
            "/api/v1/za/licenses/applications",
            &token,
            json!({"person_id": elsewhere.id, "license_category": "B"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rule_codes(&body), vec!["V00014"]);

    let (status, _) = world
        .app
        .post(
            "/api/v1/za/licenses/applications",
            &token,
            json!({"person_id": minor.id, "license_category": "Z9"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_group_creation_respects_authority() {
    let world = World::new().await;
    let clerk = world.app.login("wc_clerk").await;
    let admin = world.app.login("admin").await;

    let provincial = json!({
        "code": "WC00",
        "name": "Western Cape provincial",
        "province_code": "WC",
        "authority_level": "PROVINCIAL"
    });
    let (status, _) = world
        .app
        .post("/api/v1/za/user-groups", &clerk, provincial.clone())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = world
        .app
        .post("/api/v1/za/user-groups", &admin, provincial)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let (status, body) = world
        .app
        .post(
            "/api/v1/za/user-groups",
            &admin,
            json!({"code": "wc0", "name": "Bad", "province_code": "WC", "authority_level": "LOCAL"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, check) = world
        .app
        .get("/api/v1/za/user-groups/validate-code/WC00", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["available"], false);

    // a group that still has users cannot be deleted
    let (status, _) = world
        .app
        .delete(&format!("/api/v1/za/user-groups/{}", world.gp), &admin)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = world
        .app
        .delete(&format!("/api/v1/za/user-groups/{}", world.national), &admin)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_authz_check_endpoint() {
    let world = World::new().await;
    let token = world.app.login("wc_clerk").await;

    let (status, decision) = world
        .app
        .post(
            "/api/v1/za/authz/check",
            &token,
            json!({
                "target": {"province": "GP", "owning_user_group_id": world.gp},
                "action": "READ"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["allow"], false);

    let (status, decision) = world
        .app
        .post(
            "/api/v1/za/authz/check",
            &token,
            json!({
                "target": {"province": "WC", "owning_user_group_id": world.wc},
                "action": "WRITE"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["allow"], true);
}

#[tokio::test]
async fn test_country_endpoints() {
    let app = TestApp::new().await;

    let (status, za) = app
        .send(Method::GET, "/api/v1/countries/za", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(za["code"], "ZA");

    // KE is known but not enabled in this deployment
    for uri in ["/api/v1/countries/ke", "/api/v1/countries/xx"] {
        let (status, body) = app.send(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "unknown_country", "{uri}");
    }
}

#[tokio::test]
async fn test_helpdesk_group_membership_needs_matching_authority() {
    let world = World::new().await;
    let conn = world.app.conn();
    let gp_provincial = GroupBuilder::new("GP00", AuthorityLevel::Provincial)
        .province("GP")
        .create(conn)
        .await;
    let gp_helpdesk = GroupBuilder::new("GP09", AuthorityLevel::Local)
        .province("GP")
        .national_help_desk()
        .create(conn)
        .await;
    UserBuilder::new("gp_boss", gp_provincial.id).create(conn).await;
    let member = UserBuilder::new("gp_desk", gp_helpdesk.id).create(conn).await;
    let wc_person = PersonBuilder::new(world.wc).create(conn).await;
    let wc_person_uri = format!("/api/v1/za/persons/{}", wc_person.id);

    let boss = world.app.login("gp_boss").await;
    let (status, _) = world.app.get(&wc_person_uri, &boss).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let new_member = |username: &str, group_id: i64| {
        json!({
            "username": username,
            "password": "password123",
            "first_name": "Lerato",
            "surname": "Nkosi",
            "user_group_id": group_id
        })
    };

    // a provincial actor cannot mint a member with national read
    let (status, _) = world
        .app
        .post("/api/v1/za/users", &boss, new_member("escalated", gp_helpdesk.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(users::get_by_username(conn, "escalated").await.unwrap().is_none());

    // nor take over an existing one by resetting the password
    let (status, _) = world
        .app
        .patch(
            &format!("/api/v1/za/users/{}", member.id),
            &boss,
            json!({"password": "taken-over-1"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let desk = world.app.login("gp_desk").await;
    let (status, _) = world.app.get(&wc_person_uri, &desk).await;
    assert_eq!(status, StatusCode::OK);

    // plain groups in the province are fine
    let (status, created) = world
        .app
        .post("/api/v1/za/users", &boss, new_member("gp_clerk2", world.gp))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let admin = world.app.login("admin").await;
    let (status, _) = world
        .app
        .post("/api/v1/za/users", &admin, new_member("gp_desk2", gp_helpdesk.id))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_office_actor_cannot_create_local_users() {
    let world = World::new().await;
    let conn = world.app.conn();
    let office = GroupBuilder::new("WC05", AuthorityLevel::Office)
        .province("WC")
        .create(conn)
        .await;
    UserBuilder::new("front_desk", office.id).create(conn).await;
    let token = world.app.login("front_desk").await;

    let body = |username: &str, group_id: i64| {
        json!({
            "username": username,
            "password": "password123",
            "first_name": "Anele",
            "surname": "Zulu",
            "user_group_id": group_id
        })
    };
    let (status, _) = world
        .app
        .post("/api/v1/za/users", &token, body("wc_new", world.wc))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = world
        .app
        .post("/api/v1/za/users", &token, body("front_desk2", office.id))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["user_group_id"], office.id);
    assert!(created.get("password_hash").is_none());

    let (status, listed) = world.app.get("/api/v1/za/users", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_patch_clears_email_on_null() {
    let world = World::new().await;
    let conn = world.app.conn();
    let clerk = UserBuilder::new("wc_second", world.wc)
        .with_email("second@example.co.za")
        .create(conn)
        .await;
    let token = world.app.login("wc_clerk").await;
    let uri = format!("/api/v1/za/users/{}", clerk.id);

    let (status, updated) = world
        .app
        .patch(&uri, &token, json!({"first_name": "Second"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["email"], "second@example.co.za");

    let (status, updated) = world.app.patch(&uri, &token, json!({"email": null})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["email"], Value::Null);
    assert_eq!(updated["first_name"], "Second");
}

#[tokio::test]
async fn test_location_staff_round_trip() {
    let world = World::new().await;
    let conn = world.app.conn();
    let token = world.app.login("wc_clerk").await;
    let clerk = users::get_by_username(conn, "wc_clerk").await.unwrap().unwrap();

    let (status, location) = world
        .app
        .post(
            "/api/v1/za/locations",
            &token,
            json!({
                "location_code": "cpt9",
                "name": "Cape Town testing centre",
                "address_line1": "1 Main Road",
                "city": "Cape Town"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{location}");
    assert_eq!(location["location_code"], "CPT9");
    assert_eq!(location["province_code"], "WC");
    let uri = format!("/api/v1/za/locations/{}", location["id"]);

    let gp = world.app.login("gp_clerk").await;
    let (status, _) = world.app.get(&uri, &gp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, assignment) = world
        .app
        .post(
            &format!("{uri}/staff"),
            &token,
            json!({"user_id": clerk.id, "role": "examiner"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{assignment}");
    assert_eq!(assignment["role"], "EXAMINER");

    let (status, again) = world
        .app
        .post(
            &format!("{uri}/staff"),
            &token,
            json!({"user_id": clerk.id, "role": "EXAMINER"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{again}");

    let (_, staff) = world.app.get(&format!("{uri}/staff"), &token).await;
    assert_eq!(staff.as_array().unwrap().len(), 1);

    let (status, _) = world
        .app
        .delete(&format!("{uri}/staff/{}", assignment["id"]), &token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, staff) = world.app.get(&format!("{uri}/staff"), &token).await;
    assert!(staff.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_offices_follow_their_group() {
    let world = World::new().await;
    let admin = world.app.login("admin").await;
    let clerk = world.app.login("wc_clerk").await;

    let (status, office) = world
        .app
        .post(
            &format!("/api/v1/za/user-groups/{}/offices", world.wc),
            &admin,
            json!({"office_code": "A", "name": "Bellville"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{office}");
    let office_id = office["id"].as_i64().unwrap();
    let uri = format!("/api/v1/za/offices/{office_id}");

    let (status, _) = world.app.get(&uri, &clerk).await;
    assert_eq!(status, StatusCode::OK);
    let gp = world.app.login("gp_clerk").await;
    let (status, _) = world.app.get(&uri, &gp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, renamed) = world
        .app
        .patch(&uri, &clerk, json!({"name": "Bellville South"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Bellville South");

    // a location can be detached from its office with an explicit null
    let (status, location) = world
        .app
        .post(
            "/api/v1/za/locations",
            &clerk,
            json!({
                "office_id": office_id,
                "location_code": "BLV1",
                "name": "Bellville centre",
                "address_line1": "2 Voortrekker Road",
                "city": "Bellville"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{location}");
    assert_eq!(location["office_id"], office_id);
    let (status, detached) = world
        .app
        .patch(
            &format!("/api/v1/za/locations/{}", location["id"]),
            &clerk,
            json!({"office_id": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detached["office_id"], Value::Null);

    let (status, _) = world.app.delete(&uri, &clerk).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = world.app.get(&uri, &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_patch_cannot_exceed_own_authority() {
    let world = World::new().await;
    let conn = world.app.conn();
    let wc_provincial = GroupBuilder::new("WC00", AuthorityLevel::Provincial)
        .province("WC")
        .create(conn)
        .await;
    UserBuilder::new("wc_boss", wc_provincial.id).create(conn).await;
    let boss = world.app.login("wc_boss").await;
    let uri = format!("/api/v1/za/user-groups/{}", world.wc);

    let (status, _) = world
        .app
        .patch(&uri, &boss, json!({"authority_level": "NATIONAL"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = world
        .app
        .patch(&uri, &boss, json!({"is_national_help_desk": true}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = world
        .app
        .patch(&uri, &boss, json!({"is_provincial_help_desk": true}))
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["is_provincial_help_desk"], true);
    assert_eq!(updated["is_national_help_desk"], false);

    // GP groups are outside the province altogether
    let (status, _) = world
        .app
        .patch(
            &format!("/api/v1/za/user-groups/{}", world.gp),
            &boss,
            json!({"name": "Renamed"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_region_registration_lifecycle() {
    let world = World::new().await;
    let clerk = world.app.login("wc_clerk").await;

    let (status, region) = world
        .app
        .post(
            "/api/v1/za/regions",
            &clerk,
            json!({"region_code": "WC01", "name": "Cape Town DLTC", "region_type": "10"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{region}");
    assert_eq!(region["province_code"], "WC");
    assert_eq!(region["registration_status"], "1");
    let uri = format!("/api/v1/za/regions/{}", region["id"]);

    let operating = |body: &Value| body["operating"].as_bool().unwrap();
    let (_, status_body) = world.app.get(&format!("{uri}/operating"), &clerk).await;
    assert!(!operating(&status_body));
    assert_eq!(rule_codes(&status_body), vec!["V00489"]);

    let register = |status: &str| json!({"status": status});
    let (status, registered) = world
        .app
        .post(&format!("{uri}/registration"), &clerk, register("2"))
        .await;
    assert_eq!(status, StatusCode::OK, "{registered}");
    let (_, status_body) = world.app.get(&format!("{uri}/operating"), &clerk).await;
    assert!(operating(&status_body));

    let until = chrono::Utc::now().timestamp() + 86_400;
    let (status, suspended) = world
        .app
        .post(
            &format!("{uri}/registration"),
            &clerk,
            json!({"status": "3", "suspended_until": until}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{suspended}");
    assert_eq!(suspended["suspended_until"], until);
    let (_, status_body) = world.app.get(&format!("{uri}/operating"), &clerk).await;
    assert_eq!(rule_codes(&status_body), vec!["V00491"]);

    // back to pending is not a legal move
    let (status, _) = world
        .app
        .post(&format!("{uri}/registration"), &clerk, register("1"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, cancelled) = world
        .app
        .post(&format!("{uri}/registration"), &clerk, register("5"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["suspended_until"], Value::Null);
    let (_, status_body) = world.app.get(&format!("{uri}/operating"), &clerk).await;
    assert_eq!(rule_codes(&status_body), vec!["V00490"]);

    let (status, _) = world
        .app
        .post(&format!("{uri}/registration"), &clerk, register("2"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let admin = world.app.login("admin").await;
    let (_, rows) = world
        .app
        .get(
            &format!("/api/v1/za/audit?entity_type=region&entity_id={}", region["id"]),
            &admin,
        )
        .await;
    let transitions = rows
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["action"] == "TRANSITION")
        .count();
    assert_eq!(transitions, 3);
}

#[tokio::test]
async fn test_regions_scoped_by_owning_group() {
    let world = World::new().await;
    let clerk = world.app.login("wc_clerk").await;
    let gp = world.app.login("gp_clerk").await;
    let admin = world.app.login("admin").await;

    let create = |code: &str| {
        json!({"region_code": code, "name": format!("Region {code}"), "region_type": "20"})
    };
    let (status, region) = world
        .app
        .post("/api/v1/za/regions", &clerk, create("WC03"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{region}");

    // the code prefix has to match the owning group's province
    let (status, _) = world
        .app
        .post("/api/v1/za/regions", &clerk, create("GP03"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // national groups have no province of their own and must name one
    let (status, _) = world
        .app
        .post("/api/v1/za/regions", &admin, create("GP04"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let mut national = create("GP04");
    national["province_code"] = json!("GP");
    let (status, _) = world.app.post("/api/v1/za/regions", &admin, national).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/za/regions/{}", region["id"]);
    let (status, _) = world.app.get(&uri, &gp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = world.app.get("/api/v1/za/regions", &gp).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, listed) = world.app.get("/api/v1/za/regions", &admin).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    let (_, wc) = world.app.get("/api/v1/za/regions/by-province/wc", &admin).await;
    assert_eq!(wc.as_array().unwrap().len(), 1);
    assert_eq!(wc[0]["region_code"], "WC03");
    let (status, _) = world
        .app
        .get("/api/v1/za/regions/by-province/Western", &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, check) = world
        .app
        .get("/api/v1/za/regions/validate-code/WC03", &clerk)
        .await;
    assert_eq!(check["valid_format"], true);
    assert_eq!(check["available"], false);
    let (_, check) = world
        .app
        .get("/api/v1/za/regions/validate-code/wc3", &clerk)
        .await;
    assert_eq!(check["valid_format"], false);

    let (status, patched) = world
        .app
        .patch(&uri, &clerk, json!({"contact_person": "Ms Adams", "region_code": "WC03"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{patched}");
    assert_eq!(patched["contact_person"], "Ms Adams");
    let (status, _) = world
        .app
        .patch(&uri, &clerk, json!({"region_code": "WC09"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = world.app.delete(&uri, &gp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = world.app.delete(&uri, &clerk).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = world.app.get(&uri, &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lookups_need_no_login() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(Method::GET, "/api/v1/za/lookups", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"]["code"], "ZA");
    assert_eq!(body["genders"], json!(["01", "02"]));
    assert_eq!(body["rules"]["transition"], json!(["V00489", "V00490", "V00491"]));
}
