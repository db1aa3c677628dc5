//!
//! Per-character animation controller: parameters, clip layers, state machine and skinning output.
//!

use glam::Mat4;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::animation::{Animation, LoopMode};
use crate::base::{AnimError, DeterministicState};
use crate::blend_tree::AnimationSample;
use crate::event::{AnimationEvent, AnimationEventHistory, TriggeredEvent};
use crate::math::f32_wrap;
use crate::parameter::{AnimationParameter, AnimationParameters};
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use crate::skinning_job::SkinningJob;
use crate::state_machine::AnimationStateMachine;

/// Name recorded in the event history for events fired by `trigger_event`.
pub const MANUAL_TRIGGER_NAME: &str = "Manual Trigger";

/// Callback receiving every fired animation event.
pub type EventCallback = Rc<dyn Fn(&AnimationEvent)>;

/// Fade state of an `AnimationLayer`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum LayerFade {
    #[default]
    None,
    /// Weight ramps from 0 to 1.
    In { progress: f32, duration: f32 },
    /// Weight ramps from `from_weight` to 0, then the layer is removed.
    Out { progress: f32, duration: f32, from_weight: f32 },
}

/// One clip playing directly on the controller.
#[derive(Debug, Clone)]
pub struct AnimationLayer {
    name: String,
    animation: Rc<Animation>,
    weight: f32,
    time: f32,
    additive: bool,
    fade: LayerFade,
}

impl AnimationLayer {
    fn new(name: &str, animation: Rc<Animation>, weight: f32, time: f32, additive: bool) -> AnimationLayer {
        return AnimationLayer {
            name: name.to_string(),
            animation,
            weight: weight.max(0.0),
            time,
            additive,
            fade: LayerFade::None,
        };
    }

    /// Gets the name the clip is registered under.
    #[inline]
    pub fn name(&self) -> &str {
        return &self.name;
    }

    #[inline]
    pub fn animation(&self) -> &Rc<Animation> {
        return &self.animation;
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        return self.weight;
    }

    /// Gets the clip time in seconds.
    #[inline]
    pub fn time(&self) -> f32 {
        return self.time;
    }

    #[inline]
    pub fn is_additive(&self) -> bool {
        return self.additive;
    }

    #[inline]
    pub fn fade(&self) -> LayerFade {
        return self.fade;
    }

    #[inline]
    pub fn is_fading_in(&self) -> bool {
        return matches!(self.fade, LayerFade::In { .. });
    }

    #[inline]
    pub fn is_fading_out(&self) -> bool {
        return matches!(self.fade, LayerFade::Out { .. });
    }

    /// Advances the clip time: wrapped for `Loop`, clamped to the duration otherwise.
    fn advance(&mut self, delta_time: f32) {
        let duration = self.animation.duration();
        self.time += delta_time;
        if duration <= 0.0 {
            self.time = 0.0;
        } else if self.animation.loop_mode() == LoopMode::Loop {
            self.time = f32_wrap(self.time, duration);
        } else {
            self.time = self.time.clamp(0.0, duration);
        }
    }

    /// Drives the fade. Returns false once a fade-out has completed.
    fn update_fade(&mut self, delta_time: f32) -> bool {
        match self.fade {
            LayerFade::None => {}
            LayerFade::In { progress, duration } => {
                let progress = progress + delta_time;
                if progress >= duration {
                    self.weight = 1.0;
                    self.fade = LayerFade::None;
                } else {
                    self.weight = progress / duration;
                    self.fade = LayerFade::In { progress, duration };
                }
            }
            LayerFade::Out {
                progress,
                duration,
                from_weight,
            } => {
                let progress = progress + delta_time;
                if progress >= duration {
                    self.weight = 0.0;
                    return false;
                }
                self.weight = from_weight * (1.0 - progress / duration);
                self.fade = LayerFade::Out {
                    progress,
                    duration,
                    from_weight,
                };
            }
        }
        return true;
    }

    fn is_finished(&self) -> bool {
        return self.animation.loop_mode() == LoopMode::Once && self.time >= self.animation.duration();
    }

    fn sample(&self, skeleton: &Rc<Skeleton>) -> Pose {
        return self.animation.sample_pose(self.time, skeleton);
    }
}

/// Snapshot of a controller for tooling.
#[derive(Debug, Clone, Default)]
pub struct ControllerDebugInfo {
    /// Parameters sorted by name.
    pub parameters: Vec<(String, AnimationParameter)>,
    pub bone_count: usize,
    pub is_playing: bool,
    pub is_paused: bool,
    pub playback_speed: f32,
    pub active_samples: Vec<AnimationSample>,
    pub current_state: Option<String>,
}

///
/// Drives the animation of one character.
///
/// The controller owns the parameter table read by transitions and blend trees, a registry of
/// named clips, the layers playing them directly, an optional state machine and the event
/// history. Each frame the caller runs `update` then `evaluate`, the skinning matrices are only
/// recomputed when something changed since the last evaluation.
///
pub struct AnimationController {
    skeleton: Option<Rc<Skeleton>>,
    parameters: AnimationParameters,
    animations: HashMap<String, Rc<Animation>, DeterministicState>,
    layers: Vec<AnimationLayer>,
    state_machine: Option<Rc<RefCell<AnimationStateMachine>>>,

    paused: bool,
    playback_speed: f32,
    elapsed_time: f32,

    event_callback: Option<EventCallback>,
    event_history: AnimationEventHistory,
    event_processing_enabled: bool,

    skinning: SkinningJob,
    cached_matrices: Vec<Mat4>,
    matrices_dirty: bool,
}

impl fmt::Debug for AnimationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("AnimationController")
            .field("skeleton", &self.skeleton.as_ref().map(|s| s.num_bones()))
            .field("parameters", &self.parameters)
            .field("layers", &self.layers)
            .field("state_machine", &self.state_machine)
            .field("paused", &self.paused)
            .field("playback_speed", &self.playback_speed)
            .finish_non_exhaustive();
    }
}

impl Default for AnimationController {
    fn default() -> AnimationController {
        return AnimationController {
            skeleton: None,
            parameters: AnimationParameters::new(),
            animations: HashMap::with_hasher(DeterministicState::new()),
            layers: Vec::new(),
            state_machine: None,
            paused: false,
            playback_speed: 1.0,
            elapsed_time: 0.0,
            event_callback: None,
            event_history: AnimationEventHistory::default(),
            event_processing_enabled: true,
            skinning: SkinningJob::default(),
            cached_matrices: Vec::new(),
            matrices_dirty: true,
        };
    }
}

impl AnimationController {
    pub fn new() -> AnimationController {
        return AnimationController::default();
    }

    /// Binds the controller to a skeleton. Re-initializing swaps the skeleton and keeps the rest.
    pub fn initialize(&mut self, skeleton: Rc<Skeleton>) {
        if !skeleton.validate_hierarchy() {
            log::warn!("Skeleton hierarchy is not valid");
        }
        log::info!("Controller initialized with {} bones", skeleton.num_bones());
        self.skinning.set_skeleton(skeleton.clone());
        self.skeleton = Some(skeleton);
        self.matrices_dirty = true;
    }

    /// Drops the skeleton, clips, layers, parameters, state machine and event callback.
    pub fn shutdown(&mut self) {
        if self.skeleton.is_none() {
            return;
        }
        *self = AnimationController::default();
        log::info!("Controller shut down");
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        return self.skeleton.is_some();
    }

    #[inline]
    pub fn skeleton(&self) -> Option<&Rc<Skeleton>> {
        return self.skeleton.as_ref();
    }

    pub fn set_state_machine(&mut self, machine: Rc<RefCell<AnimationStateMachine>>) {
        self.state_machine = Some(machine);
        self.matrices_dirty = true;
    }

    pub fn clear_state_machine(&mut self) {
        self.state_machine = None;
        self.matrices_dirty = true;
    }

    /// The attached state machine. Changes made through this handle are not seen by the matrix
    /// cache until `mark_dirty` or the next `update`.
    #[inline]
    pub fn state_machine(&self) -> Option<&Rc<RefCell<AnimationStateMachine>>> {
        return self.state_machine.as_ref();
    }

    /// Jumps the attached state machine to `name` without blending.
    pub fn force_state(&mut self, name: &str) -> Result<(), AnimError> {
        let Some(machine) = self.state_machine.clone() else {
            return Err(AnimError::UnknownState(name.to_string()));
        };
        machine.borrow_mut().force_set_state(name, self)?;
        self.matrices_dirty = true;
        return Ok(());
    }

    /// Blends the attached state machine to `name`, with the authored transition if any.
    pub fn transition_to_state(&mut self, name: &str) -> Result<(), AnimError> {
        let Some(machine) = self.state_machine.clone() else {
            return Err(AnimError::UnknownState(name.to_string()));
        };
        machine.borrow_mut().transition_to(name, self)?;
        self.matrices_dirty = true;
        return Ok(());
    }

    /// Starts the attached state machine with this controller as the callback context.
    pub fn start_state_machine(&mut self) {
        if let Some(machine) = self.state_machine.clone() {
            machine.borrow_mut().start(self);
            self.matrices_dirty = true;
        }
    }

    /// Stops the attached state machine.
    pub fn stop_state_machine(&mut self) {
        if let Some(machine) = self.state_machine.clone() {
            machine.borrow_mut().stop(self);
            self.matrices_dirty = true;
        }
    }
}

impl AnimationController {
    #[inline]
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.parameters.set_float(name, value);
        self.matrices_dirty = true;
    }

    #[inline]
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.parameters.set_int(name, value);
        self.matrices_dirty = true;
    }

    #[inline]
    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.parameters.set_bool(name, value);
        self.matrices_dirty = true;
    }

    /// Arms a trigger until the end of the next `update`.
    #[inline]
    pub fn set_trigger(&mut self, name: &str) {
        self.parameters.set_trigger(name);
        self.matrices_dirty = true;
    }

    #[inline]
    pub fn reset_trigger(&mut self, name: &str) {
        self.parameters.reset_trigger(name);
        self.matrices_dirty = true;
    }

    #[inline]
    pub fn get_float(&self, name: &str) -> f32 {
        return self.parameters.get_float(name);
    }

    #[inline]
    pub fn get_int(&self, name: &str) -> i32 {
        return self.parameters.get_int(name);
    }

    #[inline]
    pub fn get_bool(&self, name: &str) -> bool {
        return self.parameters.get_bool(name);
    }

    #[inline]
    pub fn get_trigger(&self, name: &str) -> bool {
        return self.parameters.get_trigger(name);
    }

    #[inline]
    pub fn get_parameter(&self, name: &str) -> Option<AnimationParameter> {
        return self.parameters.get(name);
    }

    #[inline]
    pub fn has_parameter(&self, name: &str) -> bool {
        return self.parameters.contains(name);
    }

    #[inline]
    pub fn parameters(&self) -> &AnimationParameters {
        return &self.parameters;
    }
}

impl AnimationController {
    /// Registers a clip under `name`, replacing any clip with that name.
    pub fn add_animation(&mut self, name: &str, animation: Rc<Animation>) -> Result<(), AnimError> {
        if name.is_empty() {
            log::warn!("Cannot add an animation with an empty name");
            return Err(AnimError::EmptyName);
        }
        log::debug!("Added animation '{}'", name);
        self.animations.insert(name.to_string(), animation);
        return Ok(());
    }

    /// Unregisters a clip and drops its layer.
    pub fn remove_animation(&mut self, name: &str) -> bool {
        if self.animations.remove(name).is_none() {
            return false;
        }
        self.remove_animation_layer(name);
        return true;
    }

    #[inline]
    pub fn animation(&self, name: &str) -> Option<&Rc<Animation>> {
        return self.animations.get(name);
    }

    #[inline]
    pub fn has_animation(&self, name: &str) -> bool {
        return self.animations.contains_key(name);
    }

    /// Registered clip names, sorted.
    pub fn animation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.animations.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        return names;
    }

    fn registered(&self, name: &str) -> Result<Rc<Animation>, AnimError> {
        return match self.animations.get(name) {
            Some(animation) => Ok(animation.clone()),
            None => {
                log::warn!("Animation '{}' not found", name);
                Err(AnimError::UnknownAnimation(name.to_string()))
            }
        };
    }

    fn upsert_layer(&mut self, layer: AnimationLayer) {
        match self.layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
        self.matrices_dirty = true;
    }

    /// Plays a clip from its start, fading its weight in over `fade_time` seconds.
    /// Replaces any layer already playing that clip.
    pub fn play(&mut self, name: &str, fade_time: f32) -> Result<(), AnimError> {
        let animation = self.registered(name)?;
        let mut layer = AnimationLayer::new(name, animation, 1.0, 0.0, false);
        if fade_time > 0.0 {
            layer.weight = 0.0;
            layer.fade = LayerFade::In {
                progress: 0.0,
                duration: fade_time,
            };
        }
        log::debug!("Playing '{}' with fade time {}", name, fade_time);
        self.upsert_layer(layer);
        return Ok(());
    }

    /// Fades a clip out over `fade_time` seconds, or removes it at once. Returns false if the clip
    /// is not playing.
    pub fn stop(&mut self, name: &str, fade_time: f32) -> bool {
        let Some(idx) = self.layers.iter().position(|l| l.name == name) else {
            return false;
        };
        if fade_time > 0.0 {
            let layer = &mut self.layers[idx];
            layer.fade = LayerFade::Out {
                progress: 0.0,
                duration: fade_time,
                from_weight: layer.weight,
            };
        } else {
            self.layers.remove(idx);
        }
        log::debug!("Stopping '{}' with fade time {}", name, fade_time);
        self.matrices_dirty = true;
        return true;
    }

    /// Adds a layer with an explicit weight and start time, replacing any layer of that clip.
    pub fn add_animation_layer(&mut self, name: &str, weight: f32, time: f32, additive: bool) -> Result<(), AnimError> {
        let animation = self.registered(name)?;
        self.upsert_layer(AnimationLayer::new(name, animation, weight, time, additive));
        return Ok(());
    }

    pub fn remove_animation_layer(&mut self, name: &str) -> bool {
        let len = self.layers.len();
        self.layers.retain(|l| l.name != name);
        self.matrices_dirty = true;
        return self.layers.len() != len;
    }

    pub fn clear_animation_layers(&mut self) {
        self.layers.clear();
        self.matrices_dirty = true;
    }

    /// Replaces every layer by the given samples. Samples whose clip is not registered are skipped.
    pub fn play_blended(&mut self, samples: &[AnimationSample]) {
        self.layers.clear();
        for sample in samples.iter() {
            if sample.weight <= 0.0 {
                continue;
            }
            let name = self
                .animations
                .iter()
                .find(|(_, anim)| Rc::ptr_eq(anim, &sample.animation))
                .map(|(name, _)| name.clone());
            match name {
                Some(name) => {
                    let layer = AnimationLayer::new(&name, sample.animation.clone(), sample.weight, sample.time, false);
                    self.upsert_layer(layer);
                }
                None => log::warn!(
                    "Animation '{}' is not registered, skipped from blended playback",
                    sample.animation.name()
                ),
            }
        }
        self.matrices_dirty = true;
    }

    /// Patches the weight of existing layers. Unknown names are ignored.
    pub fn set_blend_weights(&mut self, weights: &[(&str, f32)]) {
        for (name, weight) in weights.iter() {
            if let Some(layer) = self.layers.iter_mut().find(|l| l.name == *name) {
                layer.weight = weight.max(0.0);
            }
        }
        self.matrices_dirty = true;
    }

    #[inline]
    pub fn layer(&self, name: &str) -> Option<&AnimationLayer> {
        return self.layers.iter().find(|l| l.name == name);
    }

    /// Layers in play order.
    #[inline]
    pub fn layers(&self) -> &[AnimationLayer] {
        return &self.layers;
    }

    #[inline]
    pub fn has_layer(&self, name: &str) -> bool {
        return self.layer(name).is_some();
    }

    /// Checks whether any layer or a running state machine is playing.
    pub fn is_playing(&self) -> bool {
        let machine_running = self
            .state_machine
            .as_ref()
            .is_some_and(|m| m.try_borrow().map(|m| m.is_running()).unwrap_or(false));
        return !self.layers.is_empty() || machine_running;
    }

    #[inline]
    pub fn is_animation_playing(&self, name: &str) -> bool {
        return self.has_layer(name);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        return self.paused;
    }

    #[inline]
    pub fn playback_speed(&self) -> f32 {
        return self.playback_speed;
    }

    /// Negative speeds are clamped to 0.
    #[inline]
    pub fn set_playback_speed(&mut self, speed: f32) {
        self.playback_speed = speed.max(0.0);
    }

    /// Gets the scaled time accumulated by `update`.
    #[inline]
    pub fn elapsed_time(&self) -> f32 {
        return self.elapsed_time;
    }
}

impl AnimationController {
    pub fn set_event_callback<F>(&mut self, callback: F)
    where
        F: Fn(&AnimationEvent) + 'static,
    {
        self.event_callback = Some(Rc::new(callback));
    }

    pub fn clear_event_callback(&mut self) {
        self.event_callback = None;
    }

    /// Fires an event by hand, as if a clip had reached it.
    pub fn trigger_event(&mut self, event: &AnimationEvent) {
        if !self.event_processing_enabled || !event.is_valid() {
            return;
        }
        self.dispatch_event(TriggeredEvent {
            event: event.clone(),
            time: self.elapsed_time,
            animation_time: 0.0,
            animation_name: MANUAL_TRIGGER_NAME.to_string(),
        });
    }

    fn dispatch_event(&mut self, fired: TriggeredEvent) {
        log::trace!("Event '{}' fired by '{}'", fired.event.name, fired.animation_name);
        if let Some(callback) = &self.event_callback {
            callback(&fired.event);
        }
        self.event_history.push(fired);
    }

    #[inline]
    pub fn event_history(&self) -> &AnimationEventHistory {
        return &self.event_history;
    }

    pub fn clear_event_history(&mut self) {
        self.event_history.clear();
    }

    pub fn set_event_history_size(&mut self, size: usize) {
        self.event_history.set_capacity(size);
    }

    #[inline]
    pub fn is_event_processing_enabled(&self) -> bool {
        return self.event_processing_enabled;
    }

    pub fn set_event_processing_enabled(&mut self, enabled: bool) {
        self.event_processing_enabled = enabled;
    }
}

impl AnimationController {
    /// Advances layers, fades, events and the state machine by `delta_time` seconds scaled by the
    /// playback speed, then consumes the triggers. Does nothing while paused or uninitialized.
    pub fn update(&mut self, delta_time: f32) {
        if !self.is_initialized() || self.paused {
            return;
        }

        let delta_time = delta_time * self.playback_speed;
        self.elapsed_time += delta_time;

        let mut fired = Vec::new();
        let process_events = self.event_processing_enabled;
        let elapsed_time = self.elapsed_time;
        self.layers.retain_mut(|layer| {
            let previous_time = layer.time;
            layer.advance(delta_time);
            if !layer.update_fade(delta_time) {
                return false;
            }
            if process_events {
                let looping = layer.animation.is_looping();
                layer
                    .animation
                    .process_events(previous_time, layer.time, looping, |event| {
                        fired.push(TriggeredEvent {
                            event: event.clone(),
                            time: elapsed_time,
                            animation_time: layer.time,
                            animation_name: layer.name.clone(),
                        })
                    });
            }
            return true;
        });
        for event in fired {
            self.dispatch_event(event);
        }

        self.layers
            .retain(|l| !l.is_finished() && (l.weight > 0.0 || l.is_fading_in()));
        self.matrices_dirty = true;

        if let Some(machine) = self.state_machine.clone() {
            match machine.try_borrow_mut() {
                Ok(mut machine) => machine.update(delta_time, self),
                Err(_) => log::warn!("State machine is busy, update skipped"),
            };
        }

        self.parameters.consume_triggers();
    }

    /// Writes one skinning matrix per bone, in skeleton order, into `out`. Recomputed only when
    /// something changed since the previous call. Cleared if the controller is not initialized.
    pub fn evaluate(&mut self, out: &mut Vec<Mat4>) {
        if !self.is_initialized() {
            out.clear();
            return;
        }

        if self.matrices_dirty || self.cached_matrices.is_empty() {
            let pose = self.evaluate_current_pose();
            self.cached_matrices.clear();
            match self.run_skinning(&pose) {
                Ok(()) => self.cached_matrices.extend_from_slice(self.skinning.output()),
                Err(err) => log::warn!("Skinning failed: {}", err),
            }
            self.matrices_dirty = false;
        }
        out.clone_from(&self.cached_matrices);
    }

    fn run_skinning(&mut self, pose: &Pose) -> Result<(), AnimError> {
        self.skinning.set_input_pose(pose)?;
        return self.skinning.run();
    }

    /// Forces the next `evaluate` to recompute the matrices.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.matrices_dirty = true;
    }

    /// Checks whether the next `evaluate` will recompute the matrices.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        return self.matrices_dirty;
    }

    /// Computes the current local pose: the state machine pose (or the bind pose) with the layers
    /// blended over it. Empty if the controller is not initialized.
    pub fn evaluate_current_pose(&self) -> Pose {
        let Some(skeleton) = self.skeleton.as_ref() else {
            return Pose::empty();
        };

        let mut pose = Pose::new(skeleton);
        if let Some(machine) = &self.state_machine {
            match machine.try_borrow() {
                Ok(machine) => machine.evaluate_pose(&mut pose, self),
                Err(_) => log::warn!("State machine is busy, evaluation skipped"),
            }
        }
        self.blend_animation_layers(&mut pose, skeleton);
        return pose;
    }

    /// Blends the layers into `pose`.
    ///
    /// Regular layers are weighted by their share of the total regular weight: the first one is
    /// blended against the incoming pose unless it carries the whole weight, the next ones into
    /// the accumulated result. Additive layers are then applied on top with their own weight.
    /// An invalid result is replaced by the bind pose.
    fn blend_animation_layers(&self, pose: &mut Pose, skeleton: &Rc<Skeleton>) {
        if self.layers.is_empty() {
            return;
        }

        let regular: Vec<&AnimationLayer> = self.layers.iter().filter(|l| !l.additive && l.weight > 0.0).collect();
        let total_weight: f32 = regular.iter().map(|l| l.weight).sum();

        if regular.len() == 1 && total_weight >= 1.0 {
            *pose = regular[0].sample(skeleton);
        } else {
            let base = pose.clone();
            for (idx, layer) in regular.iter().enumerate() {
                let layer_pose = layer.sample(skeleton);
                let weight = layer.weight / total_weight;
                if idx == 0 {
                    if weight < 1.0 {
                        *pose = Pose::blend(&base, &layer_pose, weight);
                    } else {
                        *pose = layer_pose;
                    }
                } else {
                    pose.blend_with(&layer_pose, weight);
                }
            }
        }

        for layer in self.layers.iter().filter(|l| l.additive && l.weight > 0.0) {
            pose.blend_additive_with(&layer.sample(skeleton), layer.weight);
        }

        if !pose.validate_pose() {
            log::warn!("Blended pose is not valid, using bind pose");
            pose.reset_to_bind_pose();
        }
    }

    pub fn debug_info(&self) -> ControllerDebugInfo {
        let mut parameters: Vec<(String, AnimationParameter)> = Vec::with_capacity(self.parameters.len());
        for name in self.parameters.names() {
            if let Some(value) = self.parameters.get(name) {
                parameters.push((name.to_string(), value));
            }
        }

        return ControllerDebugInfo {
            parameters,
            bone_count: self.skeleton.as_ref().map(|s| s.num_bones()).unwrap_or(0),
            is_playing: self.is_playing(),
            is_paused: self.paused,
            playback_speed: self.playback_speed,
            active_samples: self
                .layers
                .iter()
                .map(|l| AnimationSample {
                    animation: l.animation.clone(),
                    weight: l.weight,
                    time: l.time,
                })
                .collect(),
            current_state: self
                .state_machine
                .as_ref()
                .and_then(|m| m.try_borrow().ok().and_then(|m| m.current_state_name().map(String::from))),
        };
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use std::cell::Cell;
    use wasm_bindgen_test::*;

    use super::*;
    use crate::blend_tree::{BlendTree, BlendTreeType};
    use crate::pose::BoneTransform;
    use crate::state_machine::AnimationState;
    use crate::test_utils::{linear_clip, two_bone_skeleton, walk_animation};
    use crate::transition::TransitionBuilder;

    fn walk_controller() -> AnimationController {
        let mut controller = AnimationController::new();
        controller.initialize(Rc::new(two_bone_skeleton()));
        controller.add_animation("Walk", Rc::new(walk_animation())).unwrap();
        return controller;
    }

    fn root_x(controller: &AnimationController) -> f32 {
        return controller.evaluate_current_pose().bone_transform("Root").position.x;
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_walk_half_way() {
        let mut controller = walk_controller();
        controller.play("Walk", 0.0).unwrap();
        controller.update(0.5);
        let pose = controller.evaluate_current_pose();
        assert!(pose.bone_transform("Root").position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
        assert!(pose.bone_transform("Child").position.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_uninitialized() {
        let mut controller = AnimationController::new();
        controller.add_animation("Walk", Rc::new(walk_animation())).unwrap();
        controller.play("Walk", 0.0).unwrap();
        controller.update(0.5);
        assert_eq!(controller.layer("Walk").unwrap().time(), 0.0);

        let mut out = vec![Mat4::IDENTITY];
        controller.evaluate(&mut out);
        assert!(out.is_empty());
        assert_eq!(controller.evaluate_current_pose().bone_count(), 0);
        assert!(controller.play("Run", 0.0).unwrap_err().is_unknown_animation());
        assert!(controller.add_animation("", Rc::new(walk_animation())).unwrap_err().is_empty_name());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_fade_in_and_out() {
        let mut controller = walk_controller();
        controller.play("Walk", 0.5).unwrap();
        assert_eq!(controller.layer("Walk").unwrap().weight(), 0.0);
        controller.update(0.25);
        assert!((controller.layer("Walk").unwrap().weight() - 0.5).abs() < 1e-6);
        controller.update(0.5);
        assert_eq!(controller.layer("Walk").unwrap().weight(), 1.0);
        assert!(!controller.layer("Walk").unwrap().is_fading_in());

        assert!(controller.stop("Walk", 0.5));
        controller.update(0.25);
        assert!((controller.layer("Walk").unwrap().weight() - 0.5).abs() < 1e-6);
        controller.update(0.3);
        assert!(!controller.has_layer("Walk"));
        assert!(!controller.stop("Walk", 0.0));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_layer_time_wrap_and_once() {
        let mut controller = walk_controller();
        let mut once = linear_clip("Once", "Root", Vec3::ZERO, Vec3::X, 1.0);
        once.set_loop_mode(LoopMode::Once);
        controller.add_animation("Once", Rc::new(once)).unwrap();

        controller.play("Walk", 0.0).unwrap();
        controller.add_animation_layer("Once", 0.5, 0.0, false).unwrap();
        controller.update(0.75);
        controller.update(0.5);
        assert!((controller.layer("Walk").unwrap().time() - 0.25).abs() < 1e-5);
        assert!(!controller.has_layer("Once"));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_pause_and_speed() {
        let mut controller = walk_controller();
        controller.play("Walk", 0.0).unwrap();
        controller.pause();
        controller.update(0.5);
        assert_eq!(controller.layer("Walk").unwrap().time(), 0.0);
        controller.resume();

        controller.set_playback_speed(-2.0);
        assert_eq!(controller.playback_speed(), 0.0);
        controller.set_playback_speed(0.5);
        controller.update(0.5);
        assert!((root_x(&controller) - 0.25).abs() < 1e-5);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_normalized_layer_blend() {
        let mut controller = walk_controller();
        let still = linear_clip("Still", "Root", Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 1.0);
        controller.add_animation("Still", Rc::new(still)).unwrap();

        // A lone layer is normalized to full weight.
        controller.add_animation_layer("Still", 0.5, 0.0, false).unwrap();
        assert!((root_x(&controller) - 2.0).abs() < 1e-5);

        // The first layer blends against the bind pose, the second into the result.
        let zero = linear_clip("Zero", "Root", Vec3::ZERO, Vec3::ZERO, 1.0);
        controller.add_animation("Zero", Rc::new(zero)).unwrap();
        controller.add_animation_layer("Zero", 0.5, 0.0, false).unwrap();
        assert!((root_x(&controller) - 0.5).abs() < 1e-5);

        controller.set_blend_weights(&[("Still", 1.0), ("Zero", 0.0), ("Nope", 3.0)]);
        assert!((root_x(&controller) - 2.0).abs() < 1e-5);

        // Additive layers add their own weight on top.
        let offset = linear_clip("Offset", "Root", Vec3::X, Vec3::X, 1.0);
        controller.add_animation("Offset", Rc::new(offset)).unwrap();
        controller.add_animation_layer("Offset", 0.5, 0.0, true).unwrap();
        assert!((root_x(&controller) - 2.5).abs() < 1e-5);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_play_blended() {
        let mut controller = walk_controller();
        let walk = controller.animation("Walk").unwrap().clone();
        let stranger = Rc::new(walk_animation());
        controller.play_blended(&[
            AnimationSample {
                animation: walk,
                weight: 0.7,
                time: 0.25,
            },
            AnimationSample {
                animation: stranger,
                weight: 0.3,
                time: 0.0,
            },
        ]);
        assert_eq!(controller.layers().len(), 1);
        assert_eq!(controller.layer("Walk").unwrap().time(), 0.25);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_evaluate_cache() {
        let mut controller = walk_controller();
        controller.play("Walk", 0.0).unwrap();
        controller.update(0.5);
        assert!(controller.is_dirty());

        let mut matrices = Vec::new();
        controller.evaluate(&mut matrices);
        assert_eq!(matrices.len(), 2);
        assert!(!controller.is_dirty());
        let expected = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
        assert!(matrices[0].abs_diff_eq(expected, 1e-5));
        assert!(matrices[1].abs_diff_eq(expected, 1e-5));

        let mut again = Vec::new();
        controller.evaluate(&mut again);
        assert_eq!(matrices, again);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_evaluate_sees_parameter_and_state_changes() {
        let mut controller = walk_controller();
        let mut tree = BlendTree::new(BlendTreeType::Simple1D);
        tree.set_parameter("Speed");
        for x in [0.0, 2.0] {
            let clip = linear_clip("Hold", "Root", Vec3::new(x, 0.0, 0.0), Vec3::new(x, 0.0, 0.0), 1.0);
            tree.add_motion(Rc::new(clip), x, "").unwrap();
        }
        let still = Rc::new(linear_clip("Still", "Root", Vec3::Z, Vec3::Z, 1.0));

        let mut machine = AnimationStateMachine::new();
        machine
            .add_state(AnimationState::blend_tree("Move", Rc::new(tree)))
            .unwrap();
        machine.add_state(AnimationState::single("Still", still)).unwrap();
        controller.set_state_machine(Rc::new(RefCell::new(machine)));
        controller.start_state_machine();
        controller.update(0.1);

        let mut matrices = Vec::new();
        controller.evaluate(&mut matrices);
        assert!(matrices[0].w_axis.x.abs() < 1e-5);

        controller.set_float("Speed", 2.0);
        assert!(controller.is_dirty());
        controller.evaluate(&mut matrices);
        assert!((matrices[0].w_axis.x - 2.0).abs() < 1e-5);
        assert!((root_x(&controller) - 2.0).abs() < 1e-5);

        controller.force_state("Still").unwrap();
        controller.evaluate(&mut matrices);
        assert!(matrices[0].w_axis.z > 0.99);
        assert!(controller.force_state("Missing").unwrap_err().is_unknown_state());

        controller.state_machine().unwrap().borrow_mut().force_set_state("Move", &controller).unwrap();
        controller.mark_dirty();
        controller.evaluate(&mut matrices);
        assert!((matrices[0].w_axis.x - 2.0).abs() < 1e-5);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_events_dispatch_and_history() {
        let mut controller = walk_controller();
        let mut walk = walk_animation();
        walk.add_event(AnimationEvent::footstep("Step", 0.5, "Left", 1.0));
        controller.add_animation("Walk", Rc::new(walk)).unwrap();

        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        controller.set_event_callback(move |_| sink.set(sink.get() + 1));
        controller.play("Walk", 0.0).unwrap();

        controller.update(0.3);
        assert_eq!(count.get(), 0);
        controller.update(0.3);
        assert_eq!(count.get(), 1);
        controller.update(0.6);
        assert_eq!(count.get(), 1);
        controller.update(0.4);
        assert_eq!(count.get(), 2);

        assert_eq!(controller.event_history().len(), 2);
        assert_eq!(controller.event_history().by_name("Step")[0].animation_name, "Walk");

        controller.trigger_event(&AnimationEvent::sound("Shout", 0.0, "shout.wav", 1.0));
        assert_eq!(count.get(), 3);
        assert_eq!(controller.event_history().recent(1)[0].animation_name, MANUAL_TRIGGER_NAME);

        controller.set_event_history_size(1);
        assert_eq!(controller.event_history().len(), 1);
        controller.set_event_processing_enabled(false);
        controller.update(1.0);
        assert_eq!(count.get(), 3);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_trigger_consumed_by_update() {
        let mut controller = walk_controller();
        controller.set_trigger("Jump");
        assert!(controller.get_trigger("Jump"));
        controller.update(0.016);
        assert!(!controller.get_trigger("Jump"));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_state_machine_drives_pose() {
        let mut controller = walk_controller();
        let skeleton = controller.skeleton().unwrap().clone();
        let still = Rc::new(linear_clip("Still", "Root", Vec3::Z, Vec3::Z, 1.0));

        let mut machine = AnimationStateMachine::new();
        machine
            .add_state(AnimationState::single("Idle", still.clone()))
            .unwrap();
        machine
            .add_state(AnimationState::single("Walk", controller.animation("Walk").unwrap().clone()))
            .unwrap();
        machine
            .add_transition(TransitionBuilder::new("Idle", "Walk").duration(0.0).when_trigger("Go").build())
            .unwrap();
        controller.set_state_machine(Rc::new(RefCell::new(machine)));
        controller.start_state_machine();
        assert!(controller.is_playing());

        controller.update(0.1);
        assert!(controller
            .evaluate_current_pose()
            .bone_transform("Root")
            .abs_diff_eq(&BoneTransform::from_position(Vec3::Z), 1e-5));

        controller.set_trigger("Go");
        controller.update(0.1);
        assert_eq!(controller.debug_info().current_state.as_deref(), Some("Walk"));
        controller.update(0.25);
        assert!((root_x(&controller) - 0.25).abs() < 1e-5);

        controller.stop_state_machine();
        assert!(controller.evaluate_current_pose().abs_diff_eq(&Pose::new(&skeleton), 1e-6));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_shutdown_and_debug_info() {
        let mut controller = walk_controller();
        controller.set_float("Speed", 2.0);
        controller.play("Walk", 0.0).unwrap();
        let info = controller.debug_info();
        assert_eq!(info.bone_count, 2);
        assert!(info.is_playing);
        assert_eq!(info.parameters, vec![("Speed".to_string(), AnimationParameter::Float(2.0))]);
        assert_eq!(info.active_samples.len(), 1);

        controller.shutdown();
        assert!(!controller.is_initialized());
        assert!(controller.animation_names().is_empty());
        assert!(!controller.has_parameter("Speed"));
    }
}
