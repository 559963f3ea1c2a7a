//! Transaction and membership property tests
//!
//! Random sequences of controller actions, orchestrator ticks and view
//! completion events must never put a part in two conference roles at once.

use conference_core::{
    ActOrigin, ActionName, ActionRequest, BiographyField, BlendReason, PartId, PartState,
    PartStore, Relationships, Simulator, SimulatorModel, Tuning,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn pid(id: &str) -> PartId {
    PartId::new(id)
}

fn simulator(seed: u64) -> Simulator {
    let mut parts = PartStore::new();
    for (i, id) in IDS.iter().enumerate() {
        parts
            .register(
                PartState::new(*id, id.to_uppercase())
                    .with_trust(0.2 * i as f64)
                    .with_need_attention(0.6 * i as f64),
            )
            .unwrap();
    }
    let mut relationships = Relationships::new();
    relationships.add_protection("a", "e");
    relationships.add_grievance("b", "c", vec!["move".to_string()]);
    relationships.add_grievance("c", "b", vec!["no".to_string()]);
    relationships.add_proxy("d", "a");
    Simulator::with_seed(SimulatorModel::new(parts, relationships), Tuning::default(), seed)
}

/// Applies one generated operation.
fn apply(sim: &mut Simulator, op: usize, subject: usize, other: usize) {
    let subject = pid(IDS[subject]);
    let other = pid(IDS[other]);
    let request = match op {
        0 => ActionRequest::new(ActionName::NoticePart, subject),
        1 => ActionRequest::new(ActionName::FeelToward, subject),
        2 => ActionRequest::new(ActionName::Blend, subject),
        3 => ActionRequest::new(ActionName::DismissPart, subject),
        4 => ActionRequest::new(ActionName::InvitePart, subject).with_target(other),
        5 => ActionRequest::new(ActionName::SpontaneousBlend, subject),
        6 => ActionRequest::new(ActionName::RayFieldSelect, subject)
            .with_field(BiographyField::Age),
        7 => ActionRequest::new(ActionName::Unburden, subject),
        8 => {
            sim.advance_time(0.25);
            return;
        }
        9 => {
            // Pending blend arrived at the center
            sim.act(ActOrigin::System("pending_blend_arrived"), |ctx| {
                ctx.model.complete_pending_blend(&subject)
            });
            return;
        }
        10 => {
            // Unblending finished
            sim.act(ActOrigin::System("unblending_completed"), |ctx| {
                ctx.model.set_blending_degree(&subject, 0.0);
                ctx.model.promote_blended_to_target(&subject)
            });
            return;
        }
        _ => {
            sim.act(ActOrigin::System("demand"), |ctx| {
                ctx.model.part_demands_attention(&subject)
            });
            return;
        }
    };
    sim.perform(&request);
}

fn roles(model: &SimulatorModel, id: &PartId) -> usize {
    [model.is_target(id), model.is_blended(id), model.is_pending(id)]
        .iter()
        .filter(|r| **r)
        .count()
}

proptest! {
    #[test]
    fn prop_part_holds_at_most_one_role(
        seed in any::<u64>(),
        ops in prop::collection::vec((0usize..12, 0usize..5, 0usize..5), 1..60),
    ) {
        let mut sim = simulator(seed);
        for (op, subject, other) in ops {
            apply(&mut sim, op, subject, other);
            for id in IDS {
                prop_assert!(roles(sim.model(), &pid(id)) <= 1, "{} holds two roles", id);
            }
            prop_assert!(sim.model().check_invariants().is_ok());
            prop_assert!(!sim.in_transaction());
        }
    }

    #[test]
    fn prop_demand_displaces_previous_members(
        ops in prop::collection::vec((0usize..8, 0usize..5, 0usize..5), 0..20),
        demander in 0usize..5,
    ) {
        let mut sim = simulator(3);
        for (op, subject, other) in ops {
            apply(&mut sim, op, subject, other);
        }
        let x = pid(IDS[demander]);
        let mut expected: BTreeSet<PartId> = sim.model().targets().iter().cloned().collect();
        expected.extend(sim.model().blended().keys().cloned());
        expected.remove(&x);

        sim.act(ActOrigin::System("demand"), |ctx| ctx.model.part_demands_attention(&x));

        prop_assert_eq!(sim.model().displaced(), &expected);
        prop_assert!(sim.model().targets().is_empty());
        prop_assert_eq!(sim.model().blended().len(), 1);
        prop_assert!(sim.model().is_blended(&x));
    }
}

#[test]
fn test_demand_scenario_from_seated_target() {
    let mut parts = PartStore::new();
    parts
        .register(PartState::new("a", "A").with_trust(0.3).with_need_attention(3.0))
        .unwrap();
    parts.register(PartState::new("b", "B").with_trust(0.5)).unwrap();
    let mut model = SimulatorModel::new(parts, Relationships::new());
    model.add_target_cloud(&pid("b"));
    let mut sim = Simulator::with_seed(model, Tuning::default(), 1);

    let done = sim.act(ActOrigin::System("demand"), |ctx| {
        ctx.model.part_demands_attention(&pid("a"))
    });

    let model = sim.model();
    assert_eq!(model.displaced().iter().collect::<Vec<_>>(), vec![&pid("b")]);
    assert!(model.targets().is_empty());
    let blend = model.blend_state(&pid("a")).unwrap();
    assert!((blend.degree - 1.0).abs() < 1e-9);
    assert_eq!(blend.reason, BlendReason::Spontaneous);
    assert_eq!(done.diff.displaced_added, vec![pid("b")]);
}

#[test]
fn test_act_after_panicking_body_panics() {
    let mut sim = simulator(1);
    let first = catch_unwind(AssertUnwindSafe(|| {
        sim.act::<()>(ActOrigin::System("outer"), |ctx| {
            ctx.model.add_target_cloud(&pid("a"));
            panic!("mutation failed halfway");
        });
    }));
    assert!(first.is_err());
    assert!(sim.in_transaction());

    let second = catch_unwind(AssertUnwindSafe(|| {
        sim.perform(&ActionRequest::new(ActionName::NoticePart, "b"));
    }));
    assert!(second.is_err());
}

#[test]
fn test_each_user_action_records_once() {
    let mut sim = simulator(9);
    sim.start_recording().unwrap();
    let requests = [
        ActionRequest::new(ActionName::NoticePart, "b"),
        ActionRequest::new(ActionName::NoticePart, "b"),
        ActionRequest::new(ActionName::FeelToward, "b"),
    ];
    for request in &requests {
        sim.perform(request);
        sim.advance_time(1.0 / 60.0);
    }
    let session = sim.stop_recording().unwrap();

    // Failed actions are recorded too
    assert_eq!(session.actions.len(), requests.len());
    let recorded: Vec<&ActionRequest> = session.actions.iter().map(|a| &a.request).collect();
    assert_eq!(recorded, requests.iter().collect::<Vec<_>>());
}

#[test]
fn test_trace_line_per_transaction() {
    let mut sim = simulator(2);
    sim.perform(&ActionRequest::new(ActionName::NoticePart, "c"));
    sim.perform(&ActionRequest::new(ActionName::NoticePart, "c"));
    let trace = sim.recent_trace();
    assert_eq!(trace.len(), 2);
    assert!(trace[0].contains("+target c"));
    assert!(trace[1].contains("no discrete change"));
}
