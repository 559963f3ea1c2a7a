//! Demo Scenario
//!
//! A small cast used when no scenario file is given, and by the integration
//! tests: a critic guarding an exile, a firefighter who clashes with the
//! critic, and a planner who answers for the critic.

use session_events::{ActionName, ActionRequest, BiographyField, PartId};

use super::scenario::{GrievanceSpec, PartSpec, ProtectionSpec, ProxySpec, Scenario, ScriptStep};
use crate::components::{Biography, DialogueBank};

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn step(at_tick: u64, request: ActionRequest) -> ScriptStep {
    ScriptStep { at_tick, request }
}

/// Build the demo scenario
pub fn demo_scenario() -> Scenario {
    // === CRITIC ===
    // A manager that keeps the exile hidden by finding fault first
    let critic = PartSpec {
        id: PartId::new("critic"),
        name: "The Critic".into(),
        trust: 0.5,
        need_attention: 0.5,
        biography: Biography {
            age: Some("About twelve".into()),
            identity: Some("The one who checks everything twice".into()),
            job: Some("Point out mistakes before anyone else can".into()),
            ..Default::default()
        },
        dialogues: DialogueBank {
            job_appraisal: lines(&["Someone has to keep standards up.", "It's exhausting."]),
            job_impact: lines(&["If I stop, you'll be laughed at again."]),
            unburdened_job_appraisal: lines(&["I could choose a different job."]),
            unburdened_job_impact: lines(&["Maybe you can handle it now."]),
            reactions: lines(&["Typical.", "See? Chaos."]),
        },
    };

    // === EXILE ===
    // Young, hurt, protected by the critic
    let exile = PartSpec {
        id: PartId::new("exile"),
        name: "Little One".into(),
        trust: 0.3,
        need_attention: 2.6,
        biography: Biography {
            age: Some("Six".into()),
            identity: Some("The kid who got laughed at".into()),
            job: Some("Holds the memory".into()),
            ..Default::default()
        },
        dialogues: DialogueBank {
            job_impact: lines(&["I feel so alone."]),
            unburdened_job_impact: lines(&["I'm not alone anymore."]),
            ..Default::default()
        },
    };

    // === FIREFIGHTER ===
    // Distracts when things get hot; resents the critic
    let firefighter = PartSpec {
        id: PartId::new("firefighter"),
        name: "The Distractor".into(),
        trust: 0.4,
        need_attention: 1.9,
        biography: Biography {
            age: Some("Teenager".into()),
            job: Some("Make the bad feeling stop, fast".into()),
            ..Default::default()
        },
        dialogues: DialogueBank {
            job_appraisal: lines(&["Somebody has to put out the fires."]),
            job_impact: lines(&["You'd drown without me."]),
            reactions: lines(&["Whatever.", "Not listening."]),
            ..Default::default()
        },
    };

    // === PLANNER ===
    // Calm, speaks on the critic's behalf
    let planner = PartSpec {
        id: PartId::new("planner"),
        name: "The Planner".into(),
        trust: 0.6,
        need_attention: 0.2,
        biography: Biography {
            job: Some("Keep lists".into()),
            ..Default::default()
        },
        dialogues: DialogueBank::default(),
    };

    Scenario {
        name: "demo".into(),
        description: "Critic, exile, firefighter and planner".into(),
        self_amplification: None,
        parts: vec![critic, exile, firefighter, planner],
        protections: vec![ProtectionSpec {
            protector: PartId::new("critic"),
            protected: PartId::new("exile"),
        }],
        grievances: vec![
            GrievanceSpec {
                source: PartId::new("firefighter"),
                target: PartId::new("critic"),
                lines: lines(&["You're too harsh!", "Lighten up."]),
            },
            GrievanceSpec {
                source: PartId::new("critic"),
                target: PartId::new("firefighter"),
                lines: lines(&["You make a mess of everything."]),
            },
        ],
        proxies: vec![ProxySpec {
            source: PartId::new("critic"),
            proxy: PartId::new("planner"),
        }],
        seated: Vec::new(),
        script: vec![
            step(10, ActionRequest::new(ActionName::NoticePart, "critic")),
            step(40, ActionRequest::new(ActionName::NoticePart, "firefighter")),
            step(120, ActionRequest::new(ActionName::FeelToward, "critic")),
            step(
                200,
                ActionRequest::new(ActionName::RayFieldSelect, "critic")
                    .with_field(BiographyField::Job),
            ),
            step(
                260,
                ActionRequest::new(ActionName::InvitePart, "planner").with_target("critic"),
            ),
            step(320, ActionRequest::new(ActionName::DismissPart, "firefighter")),
            step(400, ActionRequest::new(ActionName::NoticePart, "planner")),
            step(460, ActionRequest::new(ActionName::Blend, "planner")),
            step(700, ActionRequest::new(ActionName::NoticePart, "planner")),
            step(760, ActionRequest::new(ActionName::FeelToward, "critic")),
            step(900, ActionRequest::new(ActionName::Unburden, "critic")),
        ],
    }
}
