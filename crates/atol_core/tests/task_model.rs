use atol_core::{derive_base_code, is_valid_base_code, TaskRecord, TaskStatus};
use uuid::Uuid;

#[test]
fn base_code_derivation_matches_its_own_format_check() {
    for (family, group_num, task_num) in [(None, 1, 1), (Some("K"), 99, 99), (None, 7, 23)] {
        let code = derive_base_code("w", "r", family, group_num, task_num);
        assert!(is_valid_base_code(&code), "derived code failed check: {code}");
    }
}

#[test]
fn task_record_serialization_uses_expected_wire_fields() {
    let task_id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let task = TaskRecord {
        id: task_id,
        universe_code: "W".to_string(),
        universe_name: "Work".to_string(),
        phylum_code: "R".to_string(),
        phylum_name: "Research".to_string(),
        family_code: Some("K".to_string()),
        family_name: Some("Knowledge".to_string()),
        group_num: 1,
        group_name: "Inbox".to_string(),
        task_num: 2,
        base_code: "WRK-01.02".to_string(),
        title: "Summarize findings".to_string(),
        status: TaskStatus::InProgress,
        priority: 2,
        display_order: 4,
    };

    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["id"], task_id.to_string());
    assert_eq!(json["base_code"], "WRK-01.02");
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["priority"], 2);
    assert_eq!(json["family_code"], "K");
    assert_eq!(json["universe_name"], "Work");

    let decoded: TaskRecord = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn every_status_has_a_distinct_wire_code() {
    let codes: std::collections::HashSet<char> =
        TaskStatus::ALL.iter().map(|status| status.code()).collect();
    assert_eq!(codes.len(), TaskStatus::ALL.len());
}
