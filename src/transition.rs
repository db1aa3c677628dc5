//!
//! Conditioned, timed transitions between state machine states.
//!

use std::fmt;
use std::rc::Rc;

use crate::controller::AnimationController;

/// Default cross-fade duration of a transition, in seconds.
pub const DEFAULT_TRANSITION_DURATION: f32 = 0.3;

/// Default tolerance of `TransitionCondition::float_equal`.
pub const DEFAULT_FLOAT_TOLERANCE: f32 = 0.001;

/// Predicate of a custom condition.
pub type ConditionFn = Rc<dyn Fn(&AnimationController) -> bool>;

/// Callback fired when a transition starts or completes.
pub type TransitionCallback = Rc<dyn Fn(&AnimationController)>;

/// Callback fired on every transition update with the curve-applied progress.
pub type TransitionUpdateCallback = Rc<dyn Fn(&AnimationController, f32)>;

/// Custom blend curve, maps `[0, 1]` progress to a blend weight.
pub type BlendCurveFn = Rc<dyn Fn(f32) -> f32>;

///
/// A single test against the controller parameter table.
///
/// Conditions always read the current parameter values, nothing is cached.
///
#[derive(Clone)]
pub enum TransitionCondition {
    FloatGreater { parameter: String, value: f32 },
    FloatLess { parameter: String, value: f32 },
    FloatEqual { parameter: String, value: f32, tolerance: f32 },
    IntEqual { parameter: String, value: i32 },
    IntGreater { parameter: String, value: i32 },
    IntLess { parameter: String, value: i32 },
    BoolTrue { parameter: String },
    BoolFalse { parameter: String },
    TriggerSet { parameter: String },
    Custom(ConditionFn),
}

impl TransitionCondition {
    pub fn float_greater(parameter: &str, value: f32) -> TransitionCondition {
        return TransitionCondition::FloatGreater {
            parameter: parameter.to_string(),
            value,
        };
    }

    pub fn float_less(parameter: &str, value: f32) -> TransitionCondition {
        return TransitionCondition::FloatLess {
            parameter: parameter.to_string(),
            value,
        };
    }

    pub fn float_equal(parameter: &str, value: f32, tolerance: f32) -> TransitionCondition {
        return TransitionCondition::FloatEqual {
            parameter: parameter.to_string(),
            value,
            tolerance,
        };
    }

    pub fn int_equal(parameter: &str, value: i32) -> TransitionCondition {
        return TransitionCondition::IntEqual {
            parameter: parameter.to_string(),
            value,
        };
    }

    pub fn int_greater(parameter: &str, value: i32) -> TransitionCondition {
        return TransitionCondition::IntGreater {
            parameter: parameter.to_string(),
            value,
        };
    }

    pub fn int_less(parameter: &str, value: i32) -> TransitionCondition {
        return TransitionCondition::IntLess {
            parameter: parameter.to_string(),
            value,
        };
    }

    pub fn bool_true(parameter: &str) -> TransitionCondition {
        return TransitionCondition::BoolTrue {
            parameter: parameter.to_string(),
        };
    }

    pub fn bool_false(parameter: &str) -> TransitionCondition {
        return TransitionCondition::BoolFalse {
            parameter: parameter.to_string(),
        };
    }

    pub fn trigger_set(parameter: &str) -> TransitionCondition {
        return TransitionCondition::TriggerSet {
            parameter: parameter.to_string(),
        };
    }

    pub fn custom<F>(predicate: F) -> TransitionCondition
    where
        F: Fn(&AnimationController) -> bool + 'static,
    {
        return TransitionCondition::Custom(Rc::new(predicate));
    }

    /// Gets the parameter the condition reads, `None` for custom conditions.
    pub fn parameter(&self) -> Option<&str> {
        return match self {
            TransitionCondition::FloatGreater { parameter, .. }
            | TransitionCondition::FloatLess { parameter, .. }
            | TransitionCondition::FloatEqual { parameter, .. }
            | TransitionCondition::IntEqual { parameter, .. }
            | TransitionCondition::IntGreater { parameter, .. }
            | TransitionCondition::IntLess { parameter, .. }
            | TransitionCondition::BoolTrue { parameter }
            | TransitionCondition::BoolFalse { parameter }
            | TransitionCondition::TriggerSet { parameter } => Some(parameter),
            TransitionCondition::Custom(_) => None,
        };
    }

    pub fn evaluate(&self, controller: &AnimationController) -> bool {
        return match self {
            TransitionCondition::FloatGreater { parameter, value } => controller.get_float(parameter) > *value,
            TransitionCondition::FloatLess { parameter, value } => controller.get_float(parameter) < *value,
            TransitionCondition::FloatEqual {
                parameter,
                value,
                tolerance,
            } => (controller.get_float(parameter) - value).abs() <= *tolerance,
            TransitionCondition::IntEqual { parameter, value } => controller.get_int(parameter) == *value,
            TransitionCondition::IntGreater { parameter, value } => controller.get_int(parameter) > *value,
            TransitionCondition::IntLess { parameter, value } => controller.get_int(parameter) < *value,
            TransitionCondition::BoolTrue { parameter } => controller.get_bool(parameter),
            TransitionCondition::BoolFalse { parameter } => !controller.get_bool(parameter),
            TransitionCondition::TriggerSet { parameter } => controller.get_trigger(parameter),
            TransitionCondition::Custom(predicate) => predicate(controller),
        };
    }
}

impl fmt::Display for TransitionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            TransitionCondition::FloatGreater { parameter, value } => write!(f, "{} > {}", parameter, value),
            TransitionCondition::FloatLess { parameter, value } => write!(f, "{} < {}", parameter, value),
            TransitionCondition::FloatEqual {
                parameter,
                value,
                tolerance,
            } => write!(f, "{} == {} (±{})", parameter, value, tolerance),
            TransitionCondition::IntEqual { parameter, value } => write!(f, "{} == {}", parameter, value),
            TransitionCondition::IntGreater { parameter, value } => write!(f, "{} > {}", parameter, value),
            TransitionCondition::IntLess { parameter, value } => write!(f, "{} < {}", parameter, value),
            TransitionCondition::BoolTrue { parameter } => write!(f, "{} == true", parameter),
            TransitionCondition::BoolFalse { parameter } => write!(f, "{} == false", parameter),
            TransitionCondition::TriggerSet { parameter } => write!(f, "{} (trigger)", parameter),
            TransitionCondition::Custom(_) => write!(f, "Custom condition"),
        };
    }
}

impl fmt::Debug for TransitionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "TransitionCondition({})", self);
    }
}

/// How the condition list of a transition is combined.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionLogic {
    /// Every condition must hold.
    #[default]
    And,
    /// At least one condition must hold.
    Or,
}

/// Which states may interrupt an active transition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptSource {
    #[default]
    None,
    Source,
    Destination,
    SourceAndDestination,
}

impl InterruptSource {
    #[inline]
    pub fn allows_source(&self) -> bool {
        return matches!(self, InterruptSource::Source | InterruptSource::SourceAndDestination);
    }

    #[inline]
    pub fn allows_destination(&self) -> bool {
        return matches!(self, InterruptSource::Destination | InterruptSource::SourceAndDestination);
    }
}

/// Curve applied to transition progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Uses the transition's custom curve, linear if none is set.
    Custom,
}

///
/// A directed edge `from -> to` of a state machine.
///
/// The transition fires when the exit time (if used) has been reached and the conditions hold
/// under the transition's logic. While active, the machine cross-fades the two states over
/// `duration` seconds.
///
#[derive(Clone)]
pub struct AnimationTransition {
    from_state: String,
    to_state: String,
    duration: f32,
    offset: f32,
    exit_time: f32,
    has_exit_time: bool,
    interrupt_source: InterruptSource,
    logic: TransitionLogic,
    conditions: Vec<TransitionCondition>,
    blend_mode: BlendMode,
    custom_blend_curve: Option<BlendCurveFn>,
    on_start: Option<TransitionCallback>,
    on_update: Option<TransitionUpdateCallback>,
    on_complete: Option<TransitionCallback>,
}

impl fmt::Debug for AnimationTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("AnimationTransition")
            .field("from_state", &self.from_state)
            .field("to_state", &self.to_state)
            .field("duration", &self.duration)
            .field("offset", &self.offset)
            .field("exit_time", &self.exit_time)
            .field("has_exit_time", &self.has_exit_time)
            .field("interrupt_source", &self.interrupt_source)
            .field("logic", &self.logic)
            .field("conditions", &self.conditions)
            .field("blend_mode", &self.blend_mode)
            .finish_non_exhaustive();
    }
}

impl AnimationTransition {
    pub fn new(from_state: &str, to_state: &str) -> AnimationTransition {
        return AnimationTransition {
            from_state: from_state.to_string(),
            to_state: to_state.to_string(),
            duration: DEFAULT_TRANSITION_DURATION,
            offset: 0.0,
            exit_time: 0.0,
            has_exit_time: false,
            interrupt_source: InterruptSource::None,
            logic: TransitionLogic::And,
            conditions: Vec::new(),
            blend_mode: BlendMode::Linear,
            custom_blend_curve: None,
            on_start: None,
            on_update: None,
            on_complete: None,
        };
    }

    #[inline]
    pub fn from_state(&self) -> &str {
        return &self.from_state;
    }

    #[inline]
    pub fn set_from_state(&mut self, from_state: &str) {
        self.from_state = from_state.to_string();
    }

    #[inline]
    pub fn to_state(&self) -> &str {
        return &self.to_state;
    }

    #[inline]
    pub fn set_to_state(&mut self, to_state: &str) {
        self.to_state = to_state.to_string();
    }

    /// Gets the cross-fade duration in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        return self.duration;
    }

    /// Negative durations are clamped to 0, a 0 duration transition completes instantly.
    #[inline]
    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
    }

    /// Gets the start time of the destination state, in seconds.
    #[inline]
    pub fn offset(&self) -> f32 {
        return self.offset;
    }

    #[inline]
    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
    }

    /// Gets the normalized source time the transition waits for.
    #[inline]
    pub fn exit_time(&self) -> f32 {
        return self.exit_time;
    }

    /// Clamped to `[0, 1]`. Does not enable exit time on its own.
    #[inline]
    pub fn set_exit_time(&mut self, exit_time: f32) {
        self.exit_time = exit_time.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn has_exit_time(&self) -> bool {
        return self.has_exit_time;
    }

    #[inline]
    pub fn set_has_exit_time(&mut self, has_exit_time: bool) {
        self.has_exit_time = has_exit_time;
    }

    #[inline]
    pub fn interrupt_source(&self) -> InterruptSource {
        return self.interrupt_source;
    }

    #[inline]
    pub fn set_interrupt_source(&mut self, source: InterruptSource) {
        self.interrupt_source = source;
    }

    #[inline]
    pub fn logic(&self) -> TransitionLogic {
        return self.logic;
    }

    #[inline]
    pub fn set_logic(&mut self, logic: TransitionLogic) {
        self.logic = logic;
    }

    #[inline]
    pub fn blend_mode(&self) -> BlendMode {
        return self.blend_mode;
    }

    #[inline]
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn set_custom_blend_curve<F>(&mut self, curve: F)
    where
        F: Fn(f32) -> f32 + 'static,
    {
        self.custom_blend_curve = Some(Rc::new(curve));
    }

    pub fn set_on_start<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.on_start = Some(Rc::new(callback));
    }

    pub fn set_on_update<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationController, f32) + 'static,
    {
        self.on_update = Some(Rc::new(callback));
    }

    pub fn set_on_complete<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.on_complete = Some(Rc::new(callback));
    }

    #[inline]
    pub fn conditions(&self) -> &[TransitionCondition] {
        return &self.conditions;
    }

    pub fn add_condition(&mut self, condition: TransitionCondition) {
        log::debug!(
            "Transition {} -> {}: added condition '{}'",
            self.from_state,
            self.to_state,
            condition
        );
        self.conditions.push(condition);
    }

    /// Removes the condition at `index`, if any.
    pub fn remove_condition(&mut self, index: usize) -> Option<TransitionCondition> {
        if index < self.conditions.len() {
            return Some(self.conditions.remove(index));
        }
        return None;
    }

    pub fn clear_conditions(&mut self) {
        self.conditions.clear();
    }
}

impl AnimationTransition {
    /// Combines the conditions under the transition's logic. No condition always holds.
    pub fn evaluate_conditions(&self, controller: &AnimationController) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        return match self.logic {
            TransitionLogic::And => self.conditions.iter().all(|c| c.evaluate(controller)),
            TransitionLogic::Or => self.conditions.iter().any(|c| c.evaluate(controller)),
        };
    }

    #[inline]
    pub fn is_exit_time_reached(&self, normalized_time: f32) -> bool {
        return !self.has_exit_time || normalized_time >= self.exit_time;
    }

    /// Checks whether the transition may fire with the source state at `normalized_time`.
    pub fn can_transition(&self, controller: &AnimationController, normalized_time: f32) -> bool {
        return self.is_exit_time_reached(normalized_time) && self.evaluate_conditions(controller);
    }

    /// Maps raw progress to a blend weight through the blend curve. Progress is clamped to `[0, 1]`.
    pub fn calculate_blend_weight(&self, progress: f32) -> f32 {
        let t = progress.clamp(0.0, 1.0);
        return match self.blend_mode {
            BlendMode::Linear => t,
            BlendMode::EaseIn => t * t,
            BlendMode::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            BlendMode::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = 2.0 * t - 1.0;
                    1.0 - 0.5 * (1.0 - u) * (1.0 - u)
                }
            }
            BlendMode::Custom => match &self.custom_blend_curve {
                Some(curve) => curve(t),
                None => t,
            },
        };
    }

    pub(crate) fn notify_start(&self, controller: &AnimationController) {
        log::debug!("Transition {} -> {} started", self.from_state, self.to_state);
        if let Some(callback) = &self.on_start {
            callback(controller);
        }
    }

    pub(crate) fn notify_update(&self, controller: &AnimationController, progress: f32) {
        if let Some(callback) = &self.on_update {
            callback(controller, progress);
        }
    }

    pub(crate) fn notify_complete(&self, controller: &AnimationController) {
        log::debug!("Transition {} -> {} completed", self.from_state, self.to_state);
        if let Some(callback) = &self.on_complete {
            callback(controller);
        }
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.from_state.is_empty() {
            errors.push("From state is empty".to_string());
        }
        if self.to_state.is_empty() {
            errors.push("To state is empty".to_string());
        }
        if self.duration < 0.0 {
            errors.push("Duration cannot be negative".to_string());
        }
        if self.has_exit_time && !(0.0..=1.0).contains(&self.exit_time) {
            errors.push("Exit time must be between 0 and 1".to_string());
        }
        for (idx, condition) in self.conditions.iter().enumerate() {
            if condition.parameter() == Some("") {
                errors.push(format!("Condition {} has empty parameter name", idx));
            }
        }
        return errors;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        return self.validation_errors().is_empty();
    }

    /// Multi-line human readable summary.
    pub fn transition_info(&self) -> String {
        let mut info = format!("Transition: {} -> {}\n", self.from_state, self.to_state);
        info += &format!("  Duration: {}s\n", self.duration);
        info += &format!("  Offset: {}s\n", self.offset);
        if self.has_exit_time {
            info += &format!("  Exit Time: {}\n", self.exit_time);
        } else {
            info += "  Exit Time: Not used\n";
        }
        info += &format!("  Interrupt Source: {:?}\n", self.interrupt_source);
        info += &format!("  Blend Mode: {:?}\n", self.blend_mode);
        info += &format!("  Conditions ({}):\n", self.conditions.len());
        if self.conditions.is_empty() {
            info += "    None (always true)\n";
        } else {
            info += &format!("    Logic: {:?}\n", self.logic);
            for (idx, condition) in self.conditions.iter().enumerate() {
                info += &format!("    {}. {}\n", idx + 1, condition);
            }
        }
        return info;
    }
}

///
/// Fluent construction of an `AnimationTransition`.
///
/// ```
/// use skelanim::TransitionBuilder;
///
/// let transition = TransitionBuilder::new("Idle", "Run")
///     .duration(0.2)
///     .when_float_greater("Speed", 0.5)
///     .build();
/// assert_eq!(transition.conditions().len(), 1);
/// ```
///
pub struct TransitionBuilder {
    transition: AnimationTransition,
}

impl TransitionBuilder {
    pub fn new(from_state: &str, to_state: &str) -> TransitionBuilder {
        return TransitionBuilder {
            transition: AnimationTransition::new(from_state, to_state),
        };
    }

    pub fn duration(mut self, duration: f32) -> TransitionBuilder {
        self.transition.set_duration(duration);
        return self;
    }

    pub fn offset(mut self, offset: f32) -> TransitionBuilder {
        self.transition.set_offset(offset);
        return self;
    }

    /// Sets and enables the exit time.
    pub fn exit_time(mut self, exit_time: f32) -> TransitionBuilder {
        self.transition.set_exit_time(exit_time);
        self.transition.set_has_exit_time(true);
        return self;
    }

    pub fn without_exit_time(mut self) -> TransitionBuilder {
        self.transition.set_has_exit_time(false);
        return self;
    }

    pub fn interrupt_source(mut self, source: InterruptSource) -> TransitionBuilder {
        self.transition.set_interrupt_source(source);
        return self;
    }

    pub fn blend_mode(mut self, mode: BlendMode) -> TransitionBuilder {
        self.transition.set_blend_mode(mode);
        return self;
    }

    /// Sets the curve and switches the blend mode to `Custom`.
    pub fn custom_blend_curve<F>(mut self, curve: F) -> TransitionBuilder
    where
        F: Fn(f32) -> f32 + 'static,
    {
        self.transition.set_blend_mode(BlendMode::Custom);
        self.transition.set_custom_blend_curve(curve);
        return self;
    }

    pub fn when(mut self, condition: TransitionCondition) -> TransitionBuilder {
        self.transition.add_condition(condition);
        return self;
    }

    pub fn when_float_greater(self, parameter: &str, value: f32) -> TransitionBuilder {
        return self.when(TransitionCondition::float_greater(parameter, value));
    }

    pub fn when_float_less(self, parameter: &str, value: f32) -> TransitionBuilder {
        return self.when(TransitionCondition::float_less(parameter, value));
    }

    pub fn when_int_equal(self, parameter: &str, value: i32) -> TransitionBuilder {
        return self.when(TransitionCondition::int_equal(parameter, value));
    }

    pub fn when_bool(self, parameter: &str, value: bool) -> TransitionBuilder {
        if value {
            return self.when(TransitionCondition::bool_true(parameter));
        }
        return self.when(TransitionCondition::bool_false(parameter));
    }

    pub fn when_trigger(self, parameter: &str) -> TransitionBuilder {
        return self.when(TransitionCondition::trigger_set(parameter));
    }

    pub fn when_custom<F>(self, predicate: F) -> TransitionBuilder
    where
        F: Fn(&AnimationController) -> bool + 'static,
    {
        return self.when(TransitionCondition::custom(predicate));
    }

    /// Every condition must hold.
    pub fn and(mut self) -> TransitionBuilder {
        self.transition.set_logic(TransitionLogic::And);
        return self;
    }

    /// Any condition may hold.
    pub fn or(mut self) -> TransitionBuilder {
        self.transition.set_logic(TransitionLogic::Or);
        return self;
    }

    pub fn on_start<F>(mut self, callback: F) -> TransitionBuilder
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.transition.set_on_start(callback);
        return self;
    }

    pub fn on_update<F>(mut self, callback: F) -> TransitionBuilder
    where
        F: Fn(&AnimationController, f32) + 'static,
    {
        self.transition.set_on_update(callback);
        return self;
    }

    pub fn on_complete<F>(mut self, callback: F) -> TransitionBuilder
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.transition.set_on_complete(callback);
        return self;
    }

    pub fn build(self) -> AnimationTransition {
        for error in self.transition.validation_errors() {
            log::warn!(
                "Transition {} -> {} is not valid: {}",
                self.transition.from_state,
                self.transition.to_state,
                error
            );
        }
        return self.transition;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use wasm_bindgen_test::*;

    use super::*;

    #[test]
    #[wasm_bindgen_test]
    fn test_conditions() {
        let mut controller = AnimationController::new();
        controller.set_float("Speed", 2.0);
        controller.set_int("Combo", 3);
        controller.set_bool("Grounded", true);

        assert!(TransitionCondition::float_greater("Speed", 1.0).evaluate(&controller));
        assert!(!TransitionCondition::float_less("Speed", 1.0).evaluate(&controller));
        assert!(TransitionCondition::float_equal("Speed", 2.0005, DEFAULT_FLOAT_TOLERANCE).evaluate(&controller));
        assert!(TransitionCondition::int_equal("Combo", 3).evaluate(&controller));
        assert!(TransitionCondition::int_greater("Combo", 2).evaluate(&controller));
        assert!(!TransitionCondition::int_less("Combo", 3).evaluate(&controller));
        assert!(TransitionCondition::bool_true("Grounded").evaluate(&controller));
        assert!(TransitionCondition::bool_false("Missing").evaluate(&controller));
        assert!(!TransitionCondition::trigger_set("Jump").evaluate(&controller));
        controller.set_trigger("Jump");
        assert!(TransitionCondition::trigger_set("Jump").evaluate(&controller));

        let custom = TransitionCondition::custom(|c| c.get_int("Combo") % 2 == 1);
        assert!(custom.evaluate(&controller));
        assert_eq!(custom.parameter(), None);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_condition_display() {
        assert_eq!(TransitionCondition::float_greater("Speed", 1.5).to_string(), "Speed > 1.5");
        assert_eq!(TransitionCondition::bool_false("Dead").to_string(), "Dead == false");
        assert_eq!(TransitionCondition::trigger_set("Jump").to_string(), "Jump (trigger)");
        assert_eq!(TransitionCondition::custom(|_| true).to_string(), "Custom condition");
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_exit_time_gating() {
        let transition = TransitionBuilder::new("Walk", "Run")
            .exit_time(0.8)
            .when_float_greater("Speed", 1.0)
            .build();

        let mut controller = AnimationController::new();
        controller.set_float("Speed", 5.0);
        assert!(!transition.can_transition(&controller, 0.5));
        assert!(transition.can_transition(&controller, 0.85));
        controller.set_float("Speed", 0.0);
        assert!(!transition.can_transition(&controller, 0.85));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_logic() {
        let mut controller = AnimationController::new();
        controller.set_bool("A", true);

        let empty = AnimationTransition::new("X", "Y");
        assert!(empty.evaluate_conditions(&controller));

        let and = TransitionBuilder::new("X", "Y").when_bool("A", true).when_bool("B", true).build();
        assert!(!and.can_transition(&controller, 0.0));
        let or = TransitionBuilder::new("X", "Y")
            .when_bool("A", true)
            .when_bool("B", true)
            .or()
            .build();
        assert!(or.can_transition(&controller, 0.0));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_blend_curves() {
        let mut transition = AnimationTransition::new("X", "Y");
        assert_eq!(transition.calculate_blend_weight(0.25), 0.25);
        assert_eq!(transition.calculate_blend_weight(2.0), 1.0);
        assert_eq!(transition.calculate_blend_weight(-1.0), 0.0);

        transition.set_blend_mode(BlendMode::EaseIn);
        assert_eq!(transition.calculate_blend_weight(0.5), 0.25);
        transition.set_blend_mode(BlendMode::EaseOut);
        assert_eq!(transition.calculate_blend_weight(0.5), 0.75);
        transition.set_blend_mode(BlendMode::EaseInOut);
        assert_eq!(transition.calculate_blend_weight(0.25), 0.125);
        assert_eq!(transition.calculate_blend_weight(0.5), 0.5);
        assert_eq!(transition.calculate_blend_weight(0.75), 0.875);
        assert_eq!(transition.calculate_blend_weight(1.0), 1.0);

        transition.set_blend_mode(BlendMode::Custom);
        assert_eq!(transition.calculate_blend_weight(0.3), 0.3);
        transition.set_custom_blend_curve(|t| t * 0.5);
        assert_eq!(transition.calculate_blend_weight(0.5), 0.25);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_setters_clamp() {
        let mut transition = AnimationTransition::new("X", "Y");
        assert_eq!(transition.duration(), DEFAULT_TRANSITION_DURATION);
        transition.set_duration(-1.0);
        assert_eq!(transition.duration(), 0.0);
        transition.set_exit_time(1.5);
        assert_eq!(transition.exit_time(), 1.0);
        assert!(!transition.has_exit_time());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_validation() {
        let transition = TransitionBuilder::new("", "Y").when_float_less("", 1.0).build();
        let errors = transition.validation_errors();
        assert_eq!(
            errors,
            vec!["From state is empty".to_string(), "Condition 0 has empty parameter name".to_string()]
        );
        assert!(!transition.is_valid());
        assert!(TransitionBuilder::new("X", "Y").build().is_valid());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_callbacks() {
        let counter = Rc::new(Cell::new(0));
        let last_progress = Rc::new(Cell::new(0.0));
        let (c1, c2, p) = (counter.clone(), counter.clone(), last_progress.clone());
        let transition = TransitionBuilder::new("X", "Y")
            .on_start(move |_| c1.set(c1.get() + 1))
            .on_update(move |_, progress| p.set(progress))
            .on_complete(move |_| c2.set(c2.get() + 10))
            .build();

        let controller = AnimationController::new();
        transition.notify_start(&controller);
        transition.notify_update(&controller, 0.4);
        transition.notify_complete(&controller);
        assert_eq!(counter.get(), 11);
        assert_eq!(last_progress.get(), 0.4);
        assert!(transition.transition_info().contains("Conditions (0)"));
    }
}
