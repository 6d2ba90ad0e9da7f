use converge::WaitSpec;

use super::{OperationKind, ProbeMode};

/// One convergence wait within an operation.
#[derive(Debug, Clone, Copy)]
pub struct Stage<'a> {
    pub name: &'static str,
    pub mode: ProbeMode,
    pub spec: &'a WaitSpec,
}

/// The waits each lifecycle operation of a resource kind must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePlan {
    /// Clears the window where a new resource cannot be fetched by its own id.
    pub existence: WaitSpec,
    pub provisioning: WaitSpec,
    /// `None` for resources that cannot be updated in place.
    pub update: Option<WaitSpec>,
    pub deletion: WaitSpec,
}

impl LifecyclePlan {
    /// Waits to run, in order, after the mutating call of `kind`.
    pub fn stages(&self, kind: OperationKind) -> Vec<Stage<'_>> {
        match kind {
            OperationKind::Create => vec![
                Stage {
                    name: "existence",
                    mode: ProbeMode::Existence,
                    spec: &self.existence,
                },
                Stage {
                    name: "provisioning",
                    mode: ProbeMode::Status,
                    spec: &self.provisioning,
                },
            ],
            OperationKind::Update => self
                .update
                .iter()
                .map(|spec| Stage {
                    name: "update",
                    mode: ProbeMode::Status,
                    spec,
                })
                .collect(),
            OperationKind::Delete => vec![Stage {
                name: "deletion",
                mode: ProbeMode::Absence,
                spec: &self.deletion,
            }],
            OperationKind::Read => Vec::new(),
        }
    }
}
