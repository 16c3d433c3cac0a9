//! The workflow connectivity model.
//!
//! Built as a side effect of walking a `Workflow`-class record and consulted
//! (never mutated) when step inputs and workflow outputs are validated. The
//! model is owned by the single document walk that created it.

use indexmap::IndexMap;
use indexmap::IndexSet;

/// A named input or output slot, addressable as `stepId/portId` or as a
/// bare workflow-level id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Port {
    /// The step the port belongs to; `None` for a workflow-level port.
    pub step_id: Option<String>,
    /// The port's id.
    pub port_id: String,
}

impl Port {
    /// Parses a connection value into a port reference.
    pub fn parse(value: &str) -> Self {
        match value.split_once('/') {
            Some((step, port)) => Self {
                step_id: Some(step.to_string()),
                port_id: port.to_string(),
            },
            None => Self {
                step_id: None,
                port_id: value.to_string(),
            },
        }
    }
}

/// The input and output ports a step exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInterface {
    /// The step's input port ids, in declaration order.
    pub inputs: IndexSet<String>,
    /// The step's output port ids, in declaration order.
    pub outputs: IndexSet<String>,
}

/// Why a connection value does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A bare id is not a workflow-level input.
    NoSuchWorkflowInput {
        /// The id as written.
        id: String,
    },
    /// A `stepId/portId` value references the step it sits in.
    SelfReference {
        /// The step's id.
        step: String,
    },
    /// A `stepId/portId` value names an undeclared step.
    NoSuchStep {
        /// The step id as written.
        step: String,
    },
    /// A `stepId/portId` value names a declared step but an undeclared
    /// output port.
    NoSuchPort {
        /// The step's id.
        step: String,
        /// The port id as written.
        port: String,
    },
}

/// The connectivity model of one workflow document.
#[derive(Debug, Clone, Default)]
pub struct WorkflowModel {
    /// The workflow-level input ids.
    pub input_ids: IndexSet<String>,
    /// The workflow-level output ids.
    pub output_ids: IndexSet<String>,
    /// The interface of each step, keyed by step id in document order.
    pub step_interfaces: IndexMap<String, StepInterface>,
}

impl WorkflowModel {
    /// Validates a `source`/`outputSource` connection value.
    ///
    /// `current_step` is the step the connection sits in, if any; a step
    /// may not connect to itself.
    pub fn validate_connection(
        &self,
        value: &str,
        current_step: Option<&str>,
    ) -> Result<(), ConnectionError> {
        let port = Port::parse(value);
        match port.step_id {
            None => {
                if self.input_ids.contains(&port.port_id) {
                    Ok(())
                } else {
                    Err(ConnectionError::NoSuchWorkflowInput { id: port.port_id })
                }
            }
            Some(step) => {
                if current_step == Some(step.as_str()) {
                    return Err(ConnectionError::SelfReference { step });
                }
                let Some(interface) = self.step_interfaces.get(&step) else {
                    return Err(ConnectionError::NoSuchStep { step });
                };
                if interface.outputs.contains(&port.port_id) {
                    Ok(())
                } else {
                    Err(ConnectionError::NoSuchPort {
                        step,
                        port: port.port_id,
                    })
                }
            }
        }
    }

    /// Lists the valid connection targets, for completion: every workflow
    /// input id plus every `stepId/portId` output combination, excluding
    /// the current step's own ports.
    pub fn connection_options(&self, current_step: Option<&str>) -> Vec<String> {
        let mut options: Vec<String> = self.input_ids.iter().cloned().collect();
        for (step_id, interface) in &self.step_interfaces {
            if current_step == Some(step_id.as_str()) {
                continue;
            }
            for port in &interface.outputs {
                options.push(format!("{step_id}/{port}"));
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// A two-step model with one workflow input.
    fn model() -> WorkflowModel {
        let mut model = WorkflowModel::default();
        model.input_ids.insert("reads".to_string());
        model.step_interfaces.insert("align".to_string(), StepInterface {
            inputs: ["reads".to_string()].into_iter().collect(),
            outputs: ["bam".to_string()].into_iter().collect(),
        });
        model.step_interfaces.insert("sort".to_string(), StepInterface {
            inputs: ["bam".to_string()].into_iter().collect(),
            outputs: ["sorted".to_string()].into_iter().collect(),
        });
        model
    }

    #[test]
    fn validates_workflow_input_reference() {
        let model = model();
        assert_eq!(model.validate_connection("reads", Some("align")), Ok(()));
        assert_eq!(
            model.validate_connection("read", Some("align")),
            Err(ConnectionError::NoSuchWorkflowInput {
                id: "read".to_string()
            })
        );
    }

    #[test]
    fn validates_step_port_reference() {
        let model = model();
        assert_eq!(model.validate_connection("align/bam", Some("sort")), Ok(()));
        assert_eq!(
            model.validate_connection("aling/bam", Some("sort")),
            Err(ConnectionError::NoSuchStep {
                step: "aling".to_string()
            })
        );
        assert_eq!(
            model.validate_connection("align/sam", Some("sort")),
            Err(ConnectionError::NoSuchPort {
                step: "align".to_string(),
                port: "sam".to_string()
            })
        );
        assert_eq!(
            model.validate_connection("sort/sorted", Some("sort")),
            Err(ConnectionError::SelfReference {
                step: "sort".to_string()
            })
        );
    }

    #[test]
    fn forward_references_are_legal() {
        // Output validation consults the completed step map, so a
        // connection to a later-declared step resolves.
        let model = model();
        assert_eq!(model.validate_connection("sort/sorted", None), Ok(()));
    }

    #[test]
    fn connection_options_exclude_current_step() {
        let model = model();
        let options = model.connection_options(Some("sort"));
        assert_eq!(options, ["reads", "align/bam"]);
    }
}
