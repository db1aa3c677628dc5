//!
//! Animation states and the state machine driving them.
//!

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::animation::Animation;
use crate::base::AnimError;
use crate::blend_tree::BlendTree;
use crate::controller::AnimationController;
use crate::math::f32_wrap;
use crate::pose::Pose;
use crate::transition::{AnimationTransition, DEFAULT_TRANSITION_DURATION};

/// Callback fired when a state is entered, updated or exited.
pub type StateCallback = Rc<dyn Fn(&AnimationController)>;

/// Callback receiving `(from, to)` state names. `from` is empty when the machine starts.
pub type StateChangeCallback = Rc<dyn Fn(&str, &str)>;

/// Callback receiving `(from, to, duration)` when a transition starts.
pub type TransitionStartCallback = Rc<dyn Fn(&str, &str, f32)>;

/// Content played by an `AnimationState`.
#[derive(Debug, Clone)]
pub enum StateMotion {
    Single(Rc<Animation>),
    BlendTree(Rc<BlendTree>),
    SubStateMachine(Rc<RefCell<AnimationStateMachine>>),
}

/// Kind of content of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateType {
    Single,
    BlendTree,
    SubStateMachine,
}

///
/// A named node of a state machine, playing one clip, one blend tree or a nested machine.
///
#[derive(Clone)]
pub struct AnimationState {
    name: String,
    motion: StateMotion,
    speed: f32,
    looping: bool,
    on_enter: Option<StateCallback>,
    on_update: Option<StateCallback>,
    on_exit: Option<StateCallback>,
}

impl fmt::Debug for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("AnimationState")
            .field("name", &self.name)
            .field("motion", &self.motion)
            .field("speed", &self.speed)
            .field("looping", &self.looping)
            .finish_non_exhaustive();
    }
}

impl AnimationState {
    pub fn new(name: &str, motion: StateMotion) -> AnimationState {
        return AnimationState {
            name: name.to_string(),
            motion,
            speed: 1.0,
            looping: true,
            on_enter: None,
            on_update: None,
            on_exit: None,
        };
    }

    pub fn single(name: &str, animation: Rc<Animation>) -> AnimationState {
        return AnimationState::new(name, StateMotion::Single(animation));
    }

    pub fn blend_tree(name: &str, tree: Rc<BlendTree>) -> AnimationState {
        return AnimationState::new(name, StateMotion::BlendTree(tree));
    }

    pub fn sub_state_machine(name: &str, machine: Rc<RefCell<AnimationStateMachine>>) -> AnimationState {
        return AnimationState::new(name, StateMotion::SubStateMachine(machine));
    }

    #[inline]
    pub fn name(&self) -> &str {
        return &self.name;
    }

    #[inline]
    pub fn motion(&self) -> &StateMotion {
        return &self.motion;
    }

    #[inline]
    pub fn set_motion(&mut self, motion: StateMotion) {
        self.motion = motion;
    }

    pub fn state_type(&self) -> StateType {
        return match self.motion {
            StateMotion::Single(_) => StateType::Single,
            StateMotion::BlendTree(_) => StateType::BlendTree,
            StateMotion::SubStateMachine(_) => StateType::SubStateMachine,
        };
    }

    /// Gets the playback speed multiplier.
    #[inline]
    pub fn speed(&self) -> f32 {
        return self.speed;
    }

    #[inline]
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    #[inline]
    pub fn looping(&self) -> bool {
        return self.looping;
    }

    #[inline]
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn set_on_enter<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.on_enter = Some(Rc::new(callback));
    }

    pub fn set_on_update<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.on_update = Some(Rc::new(callback));
    }

    pub fn set_on_exit<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationController) + 'static,
    {
        self.on_exit = Some(Rc::new(callback));
    }
}

impl AnimationState {
    /// Gets the duration of one cycle in seconds, ignoring speed.
    /// Blend trees report their longest motion, nested machines have no duration (0).
    pub fn duration(&self) -> f32 {
        return match &self.motion {
            StateMotion::Single(anim) => anim.duration(),
            StateMotion::BlendTree(tree) => tree.duration(),
            StateMotion::SubStateMachine(_) => 0.0,
        };
    }

    /// Maps a speed scaled time to the sampled time: wrapped if looping, clamped otherwise.
    pub fn normalize_time(&self, time: f32) -> f32 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        if self.looping {
            return f32_wrap(time, duration);
        }
        return time.clamp(0.0, duration);
    }

    /// Gets the state time as a fraction of its duration, as used by exit times.
    /// A state without duration is always at 1.
    pub fn normalized_time(&self, state_time: f32) -> f32 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 1.0;
        }
        return state_time * self.speed / duration;
    }

    pub fn is_time_at_end(&self, state_time: f32) -> bool {
        let duration = self.duration();
        return duration <= 0.0 || state_time * self.speed >= duration;
    }

    /// Evaluates the state at `state_time` seconds into `pose`.
    pub fn evaluate_pose(&self, state_time: f32, pose: &mut Pose, controller: &AnimationController) {
        let time = self.normalize_time(state_time * self.speed);
        match &self.motion {
            StateMotion::Single(anim) => anim.evaluate(time, pose),
            StateMotion::BlendTree(tree) => tree.evaluate(controller, pose, time),
            StateMotion::SubStateMachine(machine) => match machine.try_borrow() {
                Ok(machine) => machine.evaluate_pose(pose, controller),
                Err(_) => log::warn!("State '{}': nested state machine is busy", self.name),
            },
        }
    }

    pub(crate) fn enter(&self, controller: &AnimationController) {
        log::debug!("Entering state '{}'", self.name);
        if let StateMotion::SubStateMachine(machine) = &self.motion {
            match machine.try_borrow_mut() {
                Ok(mut machine) => machine.start(controller),
                Err(_) => log::warn!("State '{}': nested state machine is busy", self.name),
            }
        }
        if let Some(callback) = &self.on_enter {
            callback(controller);
        }
    }

    pub(crate) fn update(&self, delta_time: f32, controller: &AnimationController) {
        if let StateMotion::SubStateMachine(machine) = &self.motion {
            if let Ok(mut machine) = machine.try_borrow_mut() {
                machine.update(delta_time * self.speed, controller);
            }
        }
        if let Some(callback) = &self.on_update {
            callback(controller);
        }
    }

    pub(crate) fn exit(&self, controller: &AnimationController) {
        log::debug!("Exiting state '{}'", self.name);
        if let StateMotion::SubStateMachine(machine) = &self.motion {
            if let Ok(mut machine) = machine.try_borrow_mut() {
                machine.stop(controller);
            }
        }
        if let Some(callback) = &self.on_exit {
            callback(controller);
        }
    }

    pub fn validation_errors(&self) -> Vec<String> {
        return match &self.motion {
            StateMotion::Single(anim) => {
                if anim.duration() <= 0.0 {
                    vec![format!("Animation '{}' has no duration", anim.name())]
                } else {
                    Vec::new()
                }
            }
            StateMotion::BlendTree(tree) => tree.validation_errors(),
            StateMotion::SubStateMachine(machine) => match machine.try_borrow() {
                Ok(machine) => machine.validation_errors(),
                Err(_) => vec!["Nested state machine is busy".to_string()],
            },
        };
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        return self.validation_errors().is_empty();
    }

    /// One line human readable summary.
    pub fn state_info(&self) -> String {
        let content = match &self.motion {
            StateMotion::Single(anim) => format!("Single, Animation: {}", anim.name()),
            StateMotion::BlendTree(tree) => format!("BlendTree, Motions: {}", tree.node_count()),
            StateMotion::SubStateMachine(_) => "SubStateMachine".to_string(),
        };
        return format!(
            "State '{}' ({}, Speed: {}, Looping: {})",
            self.name,
            content,
            self.speed,
            if self.looping { "Yes" } else { "No" }
        );
    }
}

/// When the destination state of a transition receives its enter notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionEnterPolicy {
    /// Enter as soon as the transition starts, exit the source once it completes.
    #[default]
    AtStart,
    /// Enter once the transition completes, right after the source exits.
    AtCompletion,
}

/// Snapshot of the runtime state of a machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMachineDebugInfo {
    pub current_state: String,
    pub current_state_time: f32,
    pub previous_state: String,
    pub is_transitioning: bool,
    pub transition_target: String,
    pub transition_progress: f32,
    pub transition_time: f32,
    pub states: Vec<String>,
    pub transitions: BTreeMap<String, Vec<String>>,
}

///
/// Graph of named states connected by conditioned, timed transitions.
///
/// Each update evaluates only the transitions leaving the state that was current when the update
/// began, and the first one that can fire wins. While a transition is active the machine
/// cross-fades the previous and the current state by the curve-applied progress.
///
/// Methods firing state or transition callbacks take the controller the callbacks observe.
///
#[derive(Default)]
pub struct AnimationStateMachine {
    states: BTreeMap<String, AnimationState>,
    transitions: BTreeMap<String, Vec<Rc<AnimationTransition>>>,
    entry_state: String,
    default_state: String,
    enter_policy: TransitionEnterPolicy,

    running: bool,
    current_state: Option<String>,
    current_state_time: f32,
    previous_state: Option<String>,
    previous_state_time: f32,
    active_transition: Option<Rc<AnimationTransition>>,
    transition_time: f32,
    transition_progress: f32,

    on_state_change: Option<StateChangeCallback>,
    on_transition_start: Option<TransitionStartCallback>,
    on_transition_complete: Option<StateChangeCallback>,
}

impl fmt::Debug for AnimationStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("AnimationStateMachine")
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .field("entry_state", &self.entry_state)
            .field("running", &self.running)
            .field("current_state", &self.current_state)
            .field("previous_state", &self.previous_state)
            .field("transition_progress", &self.transition_progress)
            .finish_non_exhaustive();
    }
}

impl AnimationStateMachine {
    pub fn new() -> AnimationStateMachine {
        return AnimationStateMachine::default();
    }

    /// Adds a state, replacing one with the same name. The first state added becomes the entry state.
    pub fn add_state(&mut self, state: AnimationState) -> Result<(), AnimError> {
        if state.name.is_empty() {
            log::warn!("Cannot add a state with an empty name");
            return Err(AnimError::EmptyName);
        }
        if self.states.contains_key(&state.name) {
            log::warn!("State '{}' already exists, replacing", state.name);
        }
        if self.entry_state.is_empty() {
            self.entry_state = state.name.clone();
        }
        log::debug!("Added state '{}'", state.name);
        self.states.insert(state.name.clone(), state);
        return Ok(());
    }

    /// Removes a state and every transition touching it. Removing an active state halts the
    /// machine without exit notifications.
    pub fn remove_state(&mut self, name: &str) -> Result<(), AnimError> {
        if !self.states.contains_key(name) {
            log::warn!("State '{}' not found for removal", name);
            return Err(AnimError::UnknownState(name.to_string()));
        }

        self.remove_all_transitions_from(name);
        self.remove_all_transitions_to(name);

        let is_active = self.current_state.as_deref() == Some(name) || self.previous_state.as_deref() == Some(name);
        if is_active {
            if self.running {
                log::warn!("Removing active state '{}', stopping state machine", name);
            }
            self.clear_runtime();
        }

        self.states.remove(name);
        if self.entry_state == name {
            self.entry_state = self.states.keys().next().cloned().unwrap_or_default();
        }
        if self.default_state == name {
            self.default_state.clear();
        }
        return Ok(());
    }

    #[inline]
    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        return self.states.get(name);
    }

    #[inline]
    pub fn state_mut(&mut self, name: &str) -> Option<&mut AnimationState> {
        return self.states.get_mut(name);
    }

    #[inline]
    pub fn has_state(&self, name: &str) -> bool {
        return self.states.contains_key(name);
    }

    /// State names, sorted.
    pub fn state_names(&self) -> Vec<&str> {
        return self.states.keys().map(|n| n.as_str()).collect();
    }

    pub fn states(&self) -> impl Iterator<Item = &AnimationState> {
        return self.states.values();
    }

    /// Adds a transition between its `from_state` and `to_state`, both must exist.
    pub fn add_transition(&mut self, transition: AnimationTransition) -> Result<(), AnimError> {
        for name in [transition.from_state(), transition.to_state()] {
            if !self.has_state(name) {
                log::warn!("Transition state '{}' does not exist", name);
                return Err(AnimError::UnknownState(name.to_string()));
            }
        }
        log::debug!(
            "Added transition '{}' -> '{}'",
            transition.from_state(),
            transition.to_state()
        );
        self.transitions
            .entry(transition.from_state().to_string())
            .or_default()
            .push(Rc::new(transition));
        return Ok(());
    }

    /// Removes every transition `from -> to`.
    pub fn remove_transition(&mut self, from: &str, to: &str) -> usize {
        let mut removed = 0;
        if let Some(list) = self.transitions.get_mut(from) {
            let len = list.len();
            list.retain(|t| t.to_state() != to);
            removed = len - list.len();
            if list.is_empty() {
                self.transitions.remove(from);
            }
        }
        return removed;
    }

    pub fn remove_all_transitions_from(&mut self, from: &str) -> usize {
        return self.transitions.remove(from).map(|list| list.len()).unwrap_or(0);
    }

    pub fn remove_all_transitions_to(&mut self, to: &str) -> usize {
        let mut removed = 0;
        for list in self.transitions.values_mut() {
            let len = list.len();
            list.retain(|t| t.to_state() != to);
            removed += len - list.len();
        }
        self.transitions.retain(|_, list| !list.is_empty());
        return removed;
    }

    /// Outgoing transitions of a state, in declaration order.
    pub fn transitions_from(&self, from: &str) -> &[Rc<AnimationTransition>] {
        return self.transitions.get(from).map(|list| list.as_slice()).unwrap_or(&[]);
    }

    pub fn has_transition(&self, from: &str, to: &str) -> bool {
        return self.transitions_from(from).iter().any(|t| t.to_state() == to);
    }

    #[inline]
    pub fn entry_state(&self) -> &str {
        return &self.entry_state;
    }

    pub fn set_entry_state(&mut self, name: &str) -> Result<(), AnimError> {
        if !self.has_state(name) {
            log::warn!("Cannot set entry state to unknown state '{}'", name);
            return Err(AnimError::UnknownState(name.to_string()));
        }
        self.entry_state = name.to_string();
        return Ok(());
    }

    #[inline]
    pub fn default_state(&self) -> &str {
        return &self.default_state;
    }

    /// Sets the default state, an empty name clears it.
    pub fn set_default_state(&mut self, name: &str) -> Result<(), AnimError> {
        if !name.is_empty() && !self.has_state(name) {
            log::warn!("Cannot set default state to unknown state '{}'", name);
            return Err(AnimError::UnknownState(name.to_string()));
        }
        self.default_state = name.to_string();
        return Ok(());
    }

    #[inline]
    pub fn enter_policy(&self) -> TransitionEnterPolicy {
        return self.enter_policy;
    }

    #[inline]
    pub fn set_enter_policy(&mut self, policy: TransitionEnterPolicy) {
        self.enter_policy = policy;
    }

    pub fn set_on_state_change<F>(&mut self, callback: F)
    where
        F: Fn(&str, &str) + 'static,
    {
        self.on_state_change = Some(Rc::new(callback));
    }

    pub fn set_on_transition_start<F>(&mut self, callback: F)
    where
        F: Fn(&str, &str, f32) + 'static,
    {
        self.on_transition_start = Some(Rc::new(callback));
    }

    pub fn set_on_transition_complete<F>(&mut self, callback: F)
    where
        F: Fn(&str, &str) + 'static,
    {
        self.on_transition_complete = Some(Rc::new(callback));
    }
}

impl AnimationStateMachine {
    #[inline]
    pub fn is_running(&self) -> bool {
        return self.running;
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        return self.active_transition.is_some();
    }

    #[inline]
    pub fn current_state_name(&self) -> Option<&str> {
        return self.current_state.as_deref();
    }

    #[inline]
    pub fn previous_state_name(&self) -> Option<&str> {
        return self.previous_state.as_deref();
    }

    pub fn current_state(&self) -> Option<&AnimationState> {
        return self.current_state.as_ref().and_then(|name| self.states.get(name));
    }

    /// Gets the destination of the active transition.
    pub fn transition_target(&self) -> Option<&str> {
        return self.active_transition.as_ref().map(|t| t.to_state());
    }

    #[inline]
    pub fn active_transition(&self) -> Option<&Rc<AnimationTransition>> {
        return self.active_transition.as_ref();
    }

    /// Gets the curve-applied progress of the active transition.
    #[inline]
    pub fn transition_progress(&self) -> f32 {
        return self.transition_progress;
    }

    #[inline]
    pub fn current_state_time(&self) -> f32 {
        return self.current_state_time;
    }

    /// Gets the normalized time of the current state, 0 if there is none.
    pub fn normalized_time(&self) -> f32 {
        return self
            .current_state()
            .map(|s| s.normalized_time(self.current_state_time))
            .unwrap_or(0.0);
    }

    /// Enters the entry state. Restarts if already running.
    pub fn start(&mut self, controller: &AnimationController) {
        if self.states.is_empty() || !self.has_state(&self.entry_state) {
            log::warn!("Cannot start state machine without a valid entry state");
            return;
        }
        if self.running {
            self.stop(controller);
        }

        self.clear_runtime();
        self.running = true;
        self.current_state = Some(self.entry_state.clone());
        if let Some(state) = self.states.get(&self.entry_state) {
            state.enter(controller);
        }
        if let Some(callback) = &self.on_state_change {
            callback("", &self.entry_state);
        }
        log::info!("State machine started in '{}'", self.entry_state);
    }

    /// Exits the current state and clears the runtime state.
    pub fn stop(&mut self, controller: &AnimationController) {
        if !self.running {
            return;
        }
        if self.active_transition.is_some() {
            if let Some(state) = self.previous_state.as_ref().and_then(|name| self.states.get(name)) {
                state.exit(controller);
            }
        }
        if self.destination_entered() {
            if let Some(state) = self.current_state() {
                state.exit(controller);
            }
        }
        self.clear_runtime();
        log::info!("State machine stopped");
    }

    /// Restarts at the entry state if the machine was running.
    pub fn reset(&mut self, controller: &AnimationController) {
        let was_running = self.running;
        self.stop(controller);
        if was_running {
            self.start(controller);
        }
    }

    fn clear_runtime(&mut self) {
        self.running = false;
        self.current_state = None;
        self.current_state_time = 0.0;
        self.previous_state = None;
        self.previous_state_time = 0.0;
        self.active_transition = None;
        self.transition_time = 0.0;
        self.transition_progress = 0.0;
    }

    /// Advances the machine by `delta_time` seconds.
    pub fn update(&mut self, delta_time: f32, controller: &AnimationController) {
        if !self.running || self.current_state.is_none() {
            return;
        }

        if self.active_transition.is_some() {
            self.process_transition(delta_time, controller);
            if self.active_transition.is_some() {
                self.check_interrupts(controller);
            }
        } else {
            self.current_state_time += delta_time;
            if let Some(state) = self.current_state() {
                state.update(delta_time, controller);
            }
            if let Some(transition) = self.find_transition(self.current_state.as_deref(), self.current_state_time, controller, None) {
                self.start_transition(transition, controller);
            }
        }
    }

    /// First outgoing transition of `from` that can fire, skipping `skip`.
    fn find_transition(
        &self,
        from: Option<&str>,
        state_time: f32,
        controller: &AnimationController,
        skip: Option<&Rc<AnimationTransition>>,
    ) -> Option<Rc<AnimationTransition>> {
        let from = from?;
        let normalized_time = self.states.get(from)?.normalized_time(state_time);
        return self
            .transitions_from(from)
            .iter()
            .filter(|t| !skip.is_some_and(|s| Rc::ptr_eq(s, t)))
            .filter(|t| self.has_state(t.to_state()))
            .find(|t| t.can_transition(controller, normalized_time))
            .cloned();
    }

    fn start_transition(&mut self, transition: Rc<AnimationTransition>, controller: &AnimationController) {
        let from = self.current_state.take().unwrap_or_default();
        let to = transition.to_state().to_string();

        self.previous_state = Some(from.clone());
        self.previous_state_time = self.current_state_time;
        self.current_state = Some(to.clone());
        self.current_state_time = transition.offset();
        self.transition_time = 0.0;
        self.transition_progress = 0.0;
        self.active_transition = Some(transition.clone());

        if self.enter_policy == TransitionEnterPolicy::AtStart {
            if let Some(state) = self.states.get(&to) {
                state.enter(controller);
            }
        }
        transition.notify_start(controller);
        if let Some(callback) = &self.on_transition_start {
            callback(&from, &to, transition.duration());
        }

        if transition.duration() <= 0.0 {
            self.complete_transition(controller);
        }
    }

    fn process_transition(&mut self, delta_time: f32, controller: &AnimationController) {
        let Some(transition) = self.active_transition.clone() else {
            return;
        };

        self.transition_time += delta_time;
        self.current_state_time += delta_time;
        self.previous_state_time += delta_time;
        if let Some(state) = self.current_state() {
            state.update(delta_time, controller);
        }

        if self.transition_time >= transition.duration() {
            self.complete_transition(controller);
        } else {
            let raw = self.transition_time / transition.duration();
            self.transition_progress = transition.calculate_blend_weight(raw);
            transition.notify_update(controller, self.transition_progress);
        }
    }

    fn complete_transition(&mut self, controller: &AnimationController) {
        let Some(transition) = self.active_transition.take() else {
            return;
        };
        let from = self.previous_state.take().unwrap_or_default();
        let to = self.current_state.clone().unwrap_or_default();

        if let Some(state) = self.states.get(&from) {
            state.exit(controller);
        }
        if self.enter_policy == TransitionEnterPolicy::AtCompletion {
            if let Some(state) = self.states.get(&to) {
                state.enter(controller);
            }
        }
        transition.notify_complete(controller);

        self.transition_time = 0.0;
        self.transition_progress = 0.0;
        self.previous_state_time = 0.0;

        if let Some(callback) = &self.on_transition_complete {
            callback(&from, &to);
        }
        if let Some(callback) = &self.on_state_change {
            callback(&from, &to);
        }
        log::debug!("Transition '{}' -> '{}' completed", from, to);
    }

    fn check_interrupts(&mut self, controller: &AnimationController) {
        let Some(active) = self.active_transition.clone() else {
            return;
        };
        let source = active.interrupt_source();

        if source.allows_destination() {
            let found = self.find_transition(self.current_state.as_deref(), self.current_state_time, controller, Some(&active));
            if let Some(next) = found {
                log::debug!("Transition to '{}' interrupted by '{}'", active.to_state(), next.to_state());
                if let Some(name) = self.previous_state.take() {
                    if let Some(state) = self.states.get(&name) {
                        state.exit(controller);
                    }
                }
                self.enter_pending_destination(controller);
                self.active_transition = None;
                self.start_transition(next, controller);
                return;
            }
        }

        if source.allows_source() {
            let found = self.find_transition(self.previous_state.as_deref(), self.previous_state_time, controller, Some(&active));
            if let Some(next) = found {
                log::debug!("Transition to '{}' interrupted by '{}'", active.to_state(), next.to_state());
                if self.enter_policy == TransitionEnterPolicy::AtStart {
                    if let Some(state) = self.current_state() {
                        state.exit(controller);
                    }
                }
                self.current_state = self.previous_state.take();
                self.current_state_time = self.previous_state_time;
                self.active_transition = None;
                self.start_transition(next, controller);
            }
        }
    }

    /// Whether the current state got its enter callback. Under `AtCompletion` the destination of
    /// an active transition has not been entered yet.
    #[inline]
    fn destination_entered(&self) -> bool {
        return self.active_transition.is_none() || self.enter_policy == TransitionEnterPolicy::AtStart;
    }

    /// Enters the destination of the active transition if it is still waiting for it.
    fn enter_pending_destination(&self, controller: &AnimationController) {
        if !self.destination_entered() {
            if let Some(state) = self.current_state() {
                state.enter(controller);
            }
        }
    }

    /// Drops the active transition and settles on its destination, exiting the state it was
    /// leaving.
    fn abort_transition(&mut self, controller: &AnimationController) {
        if self.active_transition.is_some() {
            self.enter_pending_destination(controller);
            self.active_transition = None;
            if let Some(name) = self.previous_state.take() {
                if let Some(state) = self.states.get(&name) {
                    state.exit(controller);
                }
            }
            self.transition_time = 0.0;
            self.transition_progress = 0.0;
        }
    }

    /// Cross-fades to `name` using the authored transition from the current state if there is one,
    /// a default one otherwise. Conditions are not checked.
    pub fn transition_to(&mut self, name: &str, controller: &AnimationController) -> Result<(), AnimError> {
        if !self.has_state(name) {
            return Err(AnimError::UnknownState(name.to_string()));
        }
        if !self.running {
            return Err(AnimError::NotInitialized);
        }

        let from = self.current_state.clone().unwrap_or_default();
        let transition = match self.transitions_from(&from).iter().find(|t| t.to_state() == name) {
            Some(transition) => transition.clone(),
            None => {
                let mut transition = AnimationTransition::new(&from, name);
                transition.set_duration(DEFAULT_TRANSITION_DURATION);
                Rc::new(transition)
            }
        };
        self.abort_transition(controller);
        self.start_transition(transition, controller);
        return Ok(());
    }

    /// Cross-fades to `name` over `duration` seconds, or switches instantly if `duration <= 0`.
    pub fn force_transition_to(
        &mut self,
        name: &str,
        duration: f32,
        controller: &AnimationController,
    ) -> Result<(), AnimError> {
        if !self.has_state(name) {
            log::warn!("Cannot force transition to unknown state '{}'", name);
            return Err(AnimError::UnknownState(name.to_string()));
        }
        if duration <= 0.0 {
            return self.force_set_state(name, controller);
        }
        if !self.running {
            return Err(AnimError::NotInitialized);
        }

        let from = self.current_state.clone().unwrap_or_default();
        let mut transition = AnimationTransition::new(&from, name);
        transition.set_duration(duration);
        self.abort_transition(controller);
        self.start_transition(Rc::new(transition), controller);
        return Ok(());
    }

    /// Switches to `name` instantly, without blending. Starts a stopped machine at that state.
    pub fn force_set_state(&mut self, name: &str, controller: &AnimationController) -> Result<(), AnimError> {
        if !self.has_state(name) {
            log::warn!("Cannot force set unknown state '{}'", name);
            return Err(AnimError::UnknownState(name.to_string()));
        }

        self.abort_transition(controller);
        if let Some(state) = self.current_state() {
            state.exit(controller);
        }
        let from = self.current_state.take().unwrap_or_default();

        self.running = true;
        self.current_state = Some(name.to_string());
        self.current_state_time = 0.0;
        if let Some(state) = self.states.get(name) {
            state.enter(controller);
        }
        if let Some(callback) = &self.on_state_change {
            callback(&from, name);
        }
        log::debug!("Force set state '{}'", name);
        return Ok(());
    }

    /// Evaluates the machine into `pose`. A stopped machine leaves `pose` untouched.
    pub fn evaluate_pose(&self, pose: &mut Pose, controller: &AnimationController) {
        let Some(current) = self.current_state() else {
            return;
        };
        if !self.running {
            return;
        }

        let previous = self.previous_state.as_ref().and_then(|name| self.states.get(name));
        match (previous, self.is_transitioning()) {
            (Some(previous), true) => {
                let mut from_pose = pose.clone();
                let mut to_pose = pose.clone();
                previous.evaluate_pose(self.previous_state_time, &mut from_pose, controller);
                current.evaluate_pose(self.current_state_time, &mut to_pose, controller);
                *pose = Pose::blend(&from_pose, &to_pose, self.transition_progress);
            }
            _ => current.evaluate_pose(self.current_state_time, pose, controller),
        }
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.states.is_empty() {
            errors.push("No states defined".to_string());
        }
        if self.entry_state.is_empty() {
            errors.push("No entry state set".to_string());
        } else if !self.has_state(&self.entry_state) {
            errors.push(format!("Entry state '{}' does not exist", self.entry_state));
        }
        if !self.default_state.is_empty() && !self.has_state(&self.default_state) {
            errors.push(format!("Default state '{}' does not exist", self.default_state));
        }
        for (name, state) in self.states.iter() {
            for error in state.validation_errors() {
                errors.push(format!("State '{}' is invalid: {}", name, error));
            }
        }
        for list in self.transitions.values() {
            for transition in list.iter() {
                for error in transition.validation_errors() {
                    errors.push(format!(
                        "Transition '{}' -> '{}': {}",
                        transition.from_state(),
                        transition.to_state(),
                        error
                    ));
                }
            }
        }
        return errors;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        return self.validation_errors().is_empty();
    }

    pub fn validate(&self) -> Result<(), AnimError> {
        return AnimError::from_validation(self.validation_errors());
    }

    pub fn debug_info(&self) -> StateMachineDebugInfo {
        return StateMachineDebugInfo {
            current_state: self.current_state.clone().unwrap_or_default(),
            current_state_time: self.current_state_time,
            previous_state: self.previous_state.clone().unwrap_or_default(),
            is_transitioning: self.is_transitioning(),
            transition_target: self.transition_target().unwrap_or_default().to_string(),
            transition_progress: self.transition_progress,
            transition_time: self.transition_time,
            states: self.states.keys().cloned().collect(),
            transitions: self
                .transitions
                .iter()
                .map(|(from, list)| (from.clone(), list.iter().map(|t| t.to_state().to_string()).collect()))
                .collect(),
        };
    }
}
