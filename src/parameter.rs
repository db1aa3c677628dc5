//!
//! Typed animation parameters and the per-controller parameter table.
//!

use std::collections::HashMap;

use crate::base::DeterministicState;

/// Type tag of an `AnimationParameter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Float,
    Int,
    Bool,
    Trigger,
}

/// A parameter value as seen by conditions and blend trees.
///
/// A `Trigger` reads true only during the update cycle it was set in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationParameter {
    Float(f32),
    Int(i32),
    Bool(bool),
    Trigger(bool),
}

impl AnimationParameter {
    pub fn parameter_type(&self) -> ParameterType {
        return match self {
            AnimationParameter::Float(_) => ParameterType::Float,
            AnimationParameter::Int(_) => ParameterType::Int,
            AnimationParameter::Bool(_) => ParameterType::Bool,
            AnimationParameter::Trigger(_) => ParameterType::Trigger,
        };
    }

    #[inline]
    pub fn is_trigger(&self) -> bool {
        return matches!(self, AnimationParameter::Trigger(_));
    }

    pub fn as_float(&self) -> f32 {
        return match *self {
            AnimationParameter::Float(v) => v,
            AnimationParameter::Int(v) => v as f32,
            AnimationParameter::Bool(v) | AnimationParameter::Trigger(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        };
    }

    /// Floats are truncated toward zero.
    pub fn as_int(&self) -> i32 {
        return match *self {
            AnimationParameter::Float(v) => v as i32,
            AnimationParameter::Int(v) => v,
            AnimationParameter::Bool(v) | AnimationParameter::Trigger(v) => v as i32,
        };
    }

    pub fn as_bool(&self) -> bool {
        return match *self {
            AnimationParameter::Float(v) => v != 0.0,
            AnimationParameter::Int(v) => v != 0,
            AnimationParameter::Bool(v) | AnimationParameter::Trigger(v) => v,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Float(f32),
    Int(i32),
    Bool(bool),
    /// Epoch the trigger was set in.
    Trigger(Option<u64>),
}

///
/// Name to parameter table owned by a controller.
///
/// Triggers are latched against an update epoch instead of a flag: `set_trigger` stamps the
/// current epoch and the trigger reads true until `consume_triggers` advances the epoch. The
/// controller calls `consume_triggers` once at the end of every update.
///
#[derive(Debug, Clone, Default)]
pub struct AnimationParameters {
    slots: HashMap<String, Slot, DeterministicState>,
    epoch: u64,
}

impl AnimationParameters {
    pub fn new() -> AnimationParameters {
        return AnimationParameters::default();
    }

    #[inline]
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.slots.insert(name.to_string(), Slot::Float(value));
    }

    #[inline]
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.slots.insert(name.to_string(), Slot::Int(value));
    }

    #[inline]
    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.slots.insert(name.to_string(), Slot::Bool(value));
    }

    /// Arms a trigger for the current update cycle.
    #[inline]
    pub fn set_trigger(&mut self, name: &str) {
        self.slots.insert(name.to_string(), Slot::Trigger(Some(self.epoch)));
    }

    /// Disarms a trigger before the end of the cycle.
    pub fn reset_trigger(&mut self, name: &str) {
        if let Some(slot) = self.slots.get_mut(name) {
            if matches!(slot, Slot::Trigger(_)) {
                *slot = Slot::Trigger(None);
            }
        }
    }

    /// Gets a parameter, resolving trigger freshness. `None` if unknown.
    pub fn get(&self, name: &str) -> Option<AnimationParameter> {
        return self.slots.get(name).map(|slot| match *slot {
            Slot::Float(v) => AnimationParameter::Float(v),
            Slot::Int(v) => AnimationParameter::Int(v),
            Slot::Bool(v) => AnimationParameter::Bool(v),
            Slot::Trigger(epoch) => AnimationParameter::Trigger(epoch == Some(self.epoch)),
        });
    }

    /// Gets a parameter as float, 0 if unknown.
    #[inline]
    pub fn get_float(&self, name: &str) -> f32 {
        return self.get(name).map(|p| p.as_float()).unwrap_or(0.0);
    }

    /// Gets a parameter as int, 0 if unknown.
    #[inline]
    pub fn get_int(&self, name: &str) -> i32 {
        return self.get(name).map(|p| p.as_int()).unwrap_or(0);
    }

    /// Gets a parameter as bool, false if unknown.
    #[inline]
    pub fn get_bool(&self, name: &str) -> bool {
        return self.get(name).map(|p| p.as_bool()).unwrap_or(false);
    }

    /// True only for a trigger armed during the current cycle.
    #[inline]
    pub fn get_trigger(&self, name: &str) -> bool {
        return matches!(self.get(name), Some(AnimationParameter::Trigger(true)));
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        return self.slots.contains_key(name);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        return self.slots.remove(name).is_some();
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.slots.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.slots.is_empty();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Parameter names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        return names;
    }

    /// Gets the current update epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        return self.epoch;
    }

    /// Ends the current cycle: every armed trigger reads false from now on.
    #[inline]
    pub fn consume_triggers(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use wasm_bindgen_test::*;

    use super::*;

    #[test]
    #[wasm_bindgen_test]
    fn test_conversions() {
        assert_eq!(AnimationParameter::Float(2.7).as_int(), 2);
        assert_eq!(AnimationParameter::Float(-2.7).as_int(), -2);
        assert_eq!(AnimationParameter::Int(3).as_float(), 3.0);
        assert!(AnimationParameter::Int(3).as_bool());
        assert!(!AnimationParameter::Float(0.0).as_bool());
        assert_eq!(AnimationParameter::Bool(true).as_float(), 1.0);
        assert_eq!(AnimationParameter::Trigger(true).as_int(), 1);
        assert_eq!(AnimationParameter::Trigger(false).parameter_type(), ParameterType::Trigger);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_defaults_for_missing() {
        let params = AnimationParameters::new();
        assert_eq!(params.get_float("Speed"), 0.0);
        assert_eq!(params.get_int("Speed"), 0);
        assert!(!params.get_bool("Speed"));
        assert!(!params.get_trigger("Jump"));
        assert!(params.get("Speed").is_none());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_trigger_epoch() {
        let mut params = AnimationParameters::new();
        params.set_bool("Grounded", true);
        params.set_trigger("Jump");
        assert!(params.get_trigger("Jump"));
        assert!(!params.get_trigger("Grounded"));

        params.consume_triggers();
        assert!(!params.get_trigger("Jump"));
        assert_eq!(params.get("Jump"), Some(AnimationParameter::Trigger(false)));
        assert!(params.get_bool("Grounded"));

        params.set_trigger("Jump");
        params.reset_trigger("Jump");
        assert!(!params.get_trigger("Jump"));
        assert_eq!(params.names(), vec!["Grounded", "Jump"]);
    }
}
