mod common;

use std::collections::HashSet;
use std::sync::Arc;

use build_core::{BuildEventKind, Plan, PlanId, PlanStep};
use build_exec::{DelegateError, DelegateFactory};
use common::*;
use serde_json::{json, Value};

const TEMPLATE_IDS: [&str; 3] = ["tmpl-do", "tmpl-check", "tmpl-get"];

fn template() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "tmpl-do",
        "do": [
            {"id": "tmpl-check", "check": {
                "name": "image",
                "type": "registry-image",
                "source": {"repository": "my-org/img", "tag": "((.:version))"}
            }},
            {"id": "tmpl-get", "get": {
                "name": "image",
                "type": "registry-image",
                "source": {
                    "repository": "my-org/img",
                    "tag": "((.:version))",
                    "password": "((registry-password))"
                },
                "version_from": "tmpl-check"
            }}
        ]
    })).unwrap()
}

fn across_plan() -> Plan {
    plan(json!({"id": "5", "across": {
        "vars": [{"var": "version", "values": ["1.0", "1.1", "2.0"]}],
        "substep_template": String::from_utf8(template()).unwrap()
    }}))
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[test]
fn every_node_of_every_substep_gets_a_unique_id() {
    let build = build();
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let parent = across_plan();
    let delegate = DelegateFactory::new(deps(build.clone(), None)).delegate_for(&parent, run_state(runner));
    let PlanStep::Across(across) = &parent.step else { panic!("across plan") };

    let substeps = delegate.construct_across_substeps(across.substep_template.as_bytes(),
                                                      &across.var_names(),
                                                      &across.combinations())
                           .unwrap();
    assert_eq!(substeps.len(), 3);

    let mut ids = vec![];
    for step in &substeps {
        step.plan.each(&mut |p| ids.push(p.id.clone()));
    }
    assert_eq!(ids.len(), 9);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 9);
    assert!(ids.iter().all(|id| id.as_str().starts_with("5/")));
    assert_eq!(ids[0], PlanId::new("5/0/0"));
    assert_eq!(ids[8], PlanId::new("5/2/2"));

    // ningún id del template sobrevive, en ningún campo
    for step in &substeps {
        let mut strings = vec![];
        collect_strings(&serde_json::to_value(&step.plan).unwrap(), &mut strings);
        for old in TEMPLATE_IDS {
            assert!(!strings.iter().any(|s| s == old), "{old} survived in {}", step.plan.id);
        }
    }
}

#[test]
fn references_point_inside_the_same_substep() {
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let parent = across_plan();
    let delegate = DelegateFactory::new(deps(build(), None)).delegate_for(&parent, run_state(runner));
    let PlanStep::Across(across) = &parent.step else { panic!("across plan") };

    let substeps = delegate.construct_across_substeps(&template(), &across.var_names(), &across.combinations())
                           .unwrap();
    for (i, step) in substeps.iter().enumerate() {
        let mut version_from = vec![];
        step.plan.each(&mut |p| {
                     if let Some(get) = p.as_get() {
                         version_from.extend(get.version_from.clone());
                     }
                 });
        assert_eq!(version_from, vec![PlanId::new(format!("5/{i}/1"))]);
    }
}

#[test]
fn local_vars_are_interpolated_and_credentials_deferred() {
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let state = run_state(runner);
    let parent = across_plan();
    let delegate = DelegateFactory::new(deps(build(), None)).delegate_for(&parent, state.clone());

    let names = vec!["version".to_string()];
    let substeps = delegate.construct_across_substeps(&template(), &names, &[vec![json!("1.1")]]).unwrap();
    assert_eq!(substeps[0].values, vec![json!("1.1")]);

    let mut gets = vec![];
    substeps[0].plan.each(&mut |p| gets.extend(p.as_get().cloned()));
    assert_eq!(gets[0].source["tag"], "1.1");
    assert_eq!(gets[0].source["password"], "((registry-password))");
    assert!(state.vars().tracker().values().is_empty());
    // el binding no se filtra al scope del across
    assert!(state.vars().get(&build_core::VarRef::parse(".:version").unwrap()).unwrap().is_none());
}

#[test]
fn one_event_lists_all_substeps() {
    let build = build();
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let parent = across_plan();
    let delegate = DelegateFactory::new(deps(build.clone(), None)).delegate_for(&parent, run_state(runner));
    let PlanStep::Across(across) = &parent.step else { panic!("across plan") };
    delegate.construct_across_substeps(&template(), &across.var_names(), &across.combinations()).unwrap();

    let events = events_named(&build, "across-substeps");
    assert_eq!(events.len(), 1);
    match &events[0].kind {
        BuildEventKind::AcrossSubsteps { substeps } => {
            assert_eq!(substeps.len(), 3);
            assert_eq!(substeps[1]["id"], "5/1/0");
            assert!(substeps[1]["do"][1]["get"].get("source").is_none());
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn undefined_local_var_fails_with_the_substep_index() {
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let delegate = DelegateFactory::new(deps(build(), None)).delegate_for(&across_plan(), run_state(runner));
    let names = vec!["other".to_string()];

    let err = delegate.construct_across_substeps(&template(), &names, &[vec![json!("x")]]).unwrap_err();
    assert!(matches!(err, DelegateError::AcrossSubstep { index: 0, .. }));
    assert!(err.to_string().starts_with("across substep 0:"));
}

#[test]
fn failure_in_a_later_substep_emits_no_event() {
    let build = build();
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let delegate = DelegateFactory::new(deps(build.clone(), None)).delegate_for(&across_plan(), run_state(runner));
    let named_get = serde_json::to_vec(&json!({
        "id": "tmpl-get",
        "get": {"name": "((.:name))", "type": "git", "source": {}}
    })).unwrap();
    let names = vec!["name".to_string()];

    // el nombre del segundo sub-plan no es un string
    let err = delegate.construct_across_substeps(&named_get, &names, &[vec![json!("repo")], vec![json!(7)]])
                      .unwrap_err();
    assert!(matches!(err, DelegateError::AcrossSubstep { index: 1, .. }));
    assert!(events_named(&build, "across-substeps").is_empty());
}

#[test]
fn invalid_template_and_arity_mismatch_are_errors() {
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let delegate = DelegateFactory::new(deps(build(), None)).delegate_for(&across_plan(), run_state(runner));
    let names = vec!["version".to_string()];

    let err = delegate.construct_across_substeps(b"{not json", &names, &[vec![json!("1")]]).unwrap_err();
    assert!(matches!(err, DelegateError::AcrossTemplate(_)));

    let err = delegate.construct_across_substeps(&template(), &names, &[vec![json!("1")], vec![json!("1"), json!("2")]])
                      .unwrap_err();
    assert!(matches!(err, DelegateError::AcrossArity { index: 1, expected: 1, got: 2 }));
}

#[test]
fn references_outside_the_substep_are_left_untouched() {
    let runner = Arc::new(ScriptedRunner::succeeding(None));
    let delegate = DelegateFactory::new(deps(build(), None)).delegate_for(&across_plan(), run_state(runner));
    let template = serde_json::to_vec(&json!({
        "id": "tmpl-get",
        "get": {"name": "repo", "type": "git", "source": {"branch": "((.:branch))"}, "version_from": "outer-check"}
    })).unwrap();
    let names = vec!["branch".to_string()];

    let substeps = delegate.construct_across_substeps(&template, &names, &[vec![json!("main")], vec![json!("dev")]])
                           .unwrap();
    for (i, step) in substeps.iter().enumerate() {
        assert_eq!(step.plan.id, PlanId::new(format!("5/{i}/0")));
        let get = step.plan.as_get().expect("get plan");
        assert_eq!(get.version_from, Some(PlanId::new("outer-check")));
    }
    assert_eq!(substeps[1].plan.as_get().map(|g| g.source["branch"].clone()), Some(json!("dev")));
}
