// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

//! Correlation of function and trigger records into registered functions.
//!
//! Everything here is deterministic given the order of the discovery results.

use fnwire_api::definitions::{TriggerArgument, TriggerDefinition};
use fnwire_api::discovery::DiscoveredMethod;
use fnwire_api::dispatcher::RegisteredFunction;

/// Trigger records attached to the same method as `function`, in record order.
pub fn correlate_triggers<'a>(function: &DiscoveredMethod, triggers: &'a [DiscoveredMethod]) -> Vec<&'a DiscoveredMethod> {
    let identity = function.method.identity();
    triggers.iter().filter(|record| record.method.identity() == identity).collect()
}

/// Concatenate the trigger sequences of `records`, dropping falsy entries.
pub fn flatten_triggers(records: &[&DiscoveredMethod]) -> Vec<TriggerDefinition> {
    records
        .iter()
        .flat_map(|record| record.trigger_definitions().iter())
        .filter(|trigger| !trigger.is_falsy())
        .cloned()
        .collect()
}

/// Stable deduplication on the canonical form: first occurrence wins.
pub fn dedupe_triggers(triggers: Vec<TriggerDefinition>) -> Vec<TriggerDefinition> {
    let mut seen = std::collections::HashSet::new();
    triggers.into_iter().filter(|trigger| seen.insert(trigger.canonical_key())).collect()
}

/// Build one registered function per function record.
///
/// Trigger records whose method carries no function annotation are ignored.
pub fn build_registered_functions(functions: &[DiscoveredMethod], triggers: &[DiscoveredMethod]) -> Vec<RegisteredFunction> {
    let mut registered = vec![];
    for function in functions {
        let definition = match function.function_definition() {
            Some(definition) => definition.clone(),
            None => {
                log::warn!("record for method {} carries no function definition, skipping", function.method.name());
                continue;
            }
        };

        let matching = correlate_triggers(function, triggers);
        let unique_triggers = dedupe_triggers(flatten_triggers(&matching));
        let trigger_argument = TriggerArgument::collapse(unique_triggers);
        log::debug!("function {} ({}) triggers {}", definition.id, function.method.name(), trigger_argument);

        registered.push(RegisteredFunction {
            definition,
            triggers: trigger_argument,
            handler: function.method.bind(function.instance.clone()),
        });
    }

    for orphan in triggers
        .iter()
        .filter(|record| !functions.iter().any(|f| f.method.identity() == record.method.identity()))
    {
        log::warn!("method {} has triggers but no function annotation, not registered", orphan.method.name());
    }

    registered
}
