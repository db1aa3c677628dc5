//!
//! Timeline events embedded in animation clips, and the history of fired events.
//!

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::base::DEFAULT_EVENT_HISTORY_SIZE;

/// Two events with the same name closer than this are the same event.
const EVENT_TIME_EPSILON: f32 = 0.001;

/// Gameplay category of an `AnimationEvent`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationEventType {
    #[default]
    Generic,
    Sound,
    Effect,
    Footstep,
    Combat,
    Custom,
}

impl AnimationEventType {
    pub fn as_str(&self) -> &'static str {
        return match self {
            AnimationEventType::Generic => "Generic",
            AnimationEventType::Sound => "Sound",
            AnimationEventType::Effect => "Effect",
            AnimationEventType::Footstep => "Footstep",
            AnimationEventType::Combat => "Combat",
            AnimationEventType::Custom => "Custom",
        };
    }
}

impl fmt::Display for AnimationEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

impl FromStr for AnimationEventType {
    type Err = ();

    /// Unknown names parse as `Generic`, never fail.
    fn from_str(s: &str) -> Result<AnimationEventType, ()> {
        return Ok(match s {
            "Sound" => AnimationEventType::Sound,
            "Effect" => AnimationEventType::Effect,
            "Footstep" => AnimationEventType::Footstep,
            "Combat" => AnimationEventType::Combat,
            "Custom" => AnimationEventType::Custom,
            _ => AnimationEventType::Generic,
        });
    }
}

///
/// An event placed on a clip timeline.
///
/// `time` is normalized over the clip duration. The payload fields are free for gameplay
/// code: a sound event usually carries the sound name in `string_param` and the volume in
/// `float_param`.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnimationEvent {
    pub name: String,
    pub time: f32,
    pub event_type: AnimationEventType,
    pub string_param: String,
    pub float_param: f32,
    pub int_param: i32,
    pub bool_param: bool,
    pub description: String,
    pub priority: i32,
    pub enabled: bool,
}

impl Default for AnimationEvent {
    fn default() -> AnimationEvent {
        return AnimationEvent {
            name: String::new(),
            time: 0.0,
            event_type: AnimationEventType::Generic,
            string_param: String::new(),
            float_param: 0.0,
            int_param: 0,
            bool_param: false,
            description: String::new(),
            priority: 0,
            enabled: true,
        };
    }
}

impl AnimationEvent {
    pub fn new(name: &str, time: f32, event_type: AnimationEventType) -> AnimationEvent {
        return AnimationEvent {
            name: name.to_string(),
            time,
            event_type,
            ..Default::default()
        };
    }

    /// Sound event, `string_param` holds the sound and `float_param` the volume.
    pub fn sound(name: &str, time: f32, sound: &str, volume: f32) -> AnimationEvent {
        return AnimationEvent::new(name, time, AnimationEventType::Sound)
            .with_string(sound)
            .with_float(volume);
    }

    /// Effect event, `string_param` holds the effect and `float_param` the scale.
    pub fn effect(name: &str, time: f32, effect: &str, scale: f32) -> AnimationEvent {
        return AnimationEvent::new(name, time, AnimationEventType::Effect)
            .with_string(effect)
            .with_float(scale);
    }

    /// Footstep event, `string_param` holds the foot and `float_param` the intensity.
    pub fn footstep(name: &str, time: f32, foot: &str, intensity: f32) -> AnimationEvent {
        return AnimationEvent::new(name, time, AnimationEventType::Footstep)
            .with_string(foot)
            .with_float(intensity);
    }

    /// Combat event, `string_param` holds the action and `float_param` the damage.
    pub fn combat(name: &str, time: f32, action: &str, damage: f32) -> AnimationEvent {
        return AnimationEvent::new(name, time, AnimationEventType::Combat)
            .with_string(action)
            .with_float(damage);
    }

    pub fn with_string(mut self, value: &str) -> AnimationEvent {
        self.string_param = value.to_string();
        return self;
    }

    pub fn with_float(mut self, value: f32) -> AnimationEvent {
        self.float_param = value;
        return self;
    }

    pub fn with_int(mut self, value: i32) -> AnimationEvent {
        self.int_param = value;
        return self;
    }

    pub fn with_bool(mut self, value: bool) -> AnimationEvent {
        self.bool_param = value;
        return self;
    }

    pub fn with_priority(mut self, priority: i32) -> AnimationEvent {
        self.priority = priority;
        return self;
    }

    pub fn with_description(mut self, description: &str) -> AnimationEvent {
        self.description = description.to_string();
        return self;
    }

    #[inline]
    pub fn is_time_valid(&self) -> bool {
        return (0.0..=1.0).contains(&self.time);
    }

    /// Valid events have a name, a normalized time and are enabled.
    #[inline]
    pub fn is_valid(&self) -> bool {
        return !self.name.is_empty() && self.is_time_valid() && self.enabled;
    }

    #[inline]
    fn same_slot(&self, name: &str, time: f32) -> bool {
        return self.name == name && (self.time - time).abs() < EVENT_TIME_EPSILON;
    }

    /// Tests the trigger window.
    ///
    /// Linear playback fires on `(prev, curr]`. Looping playback that wrapped around
    /// (`curr < prev`) fires on `(prev, 1]` and `[0, curr]`.
    pub fn is_triggered(&self, prev: f32, curr: f32, looping: bool) -> bool {
        if !self.enabled {
            return false;
        }
        if looping && curr < prev {
            return (self.time > prev && self.time <= 1.0) || (self.time >= 0.0 && self.time <= curr);
        }
        return self.time > prev && self.time <= curr;
    }
}

///
/// Ordered collection of the events of one clip.
///
/// Events keep their declaration order; that order breaks priority ties when a batch is
/// triggered.
///
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AnimationEventManager {
    events: Vec<AnimationEvent>,
}

impl AnimationEventManager {
    pub fn new() -> AnimationEventManager {
        return AnimationEventManager::default();
    }

    /// Adds an event. Invalid events are ignored, an event with the same name and time
    /// is replaced. Returns false if ignored.
    pub fn add_event(&mut self, event: AnimationEvent) -> bool {
        if !event.is_valid() {
            log::warn!("Ignored invalid animation event '{}' at {}", event.name, event.time);
            return false;
        }
        match self.events.iter_mut().find(|e| e.same_slot(&event.name, event.time)) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
        return true;
    }

    /// Removes the event with this name at this normalized time.
    pub fn remove_event(&mut self, name: &str, time: f32) -> bool {
        let len = self.events.len();
        self.events.retain(|e| !e.same_slot(name, time));
        return self.events.len() != len;
    }

    /// Removes every event with this name, returns how many were removed.
    pub fn remove_all_events(&mut self, name: &str) -> usize {
        let len = self.events.len();
        self.events.retain(|e| e.name != name);
        return len - self.events.len();
    }

    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Gets events in declaration order.
    #[inline]
    pub fn events(&self) -> &[AnimationEvent] {
        return &self.events;
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.events.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.events.is_empty();
    }

    /// Gets events with `start <= time <= end`, sorted by time.
    pub fn events_in_range(&self, start: f32, end: f32) -> Vec<AnimationEvent> {
        let mut events: Vec<AnimationEvent> = self
            .events
            .iter()
            .filter(|e| e.time >= start && e.time <= end)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        return events;
    }

    pub fn events_by_name(&self, name: &str) -> Vec<AnimationEvent> {
        return self.events.iter().filter(|e| e.name == name).cloned().collect();
    }

    pub fn events_by_type(&self, event_type: AnimationEventType) -> Vec<AnimationEvent> {
        return self
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect();
    }

    pub fn has_event(&self, name: &str, time: f32) -> bool {
        return self.events.iter().any(|e| e.same_slot(name, time));
    }

    pub fn set_event_enabled(&mut self, name: &str, time: f32, enabled: bool) {
        for event in self.events.iter_mut().filter(|e| e.same_slot(name, time)) {
            event.enabled = enabled;
        }
    }

    pub fn set_all_events_enabled(&mut self, enabled: bool) {
        for event in self.events.iter_mut() {
            event.enabled = enabled;
        }
    }

    /// Gets the events fired between two normalized times.
    ///
    /// The batch is sorted by priority, highest first, ties keep declaration order.
    pub fn triggered_events(&self, prev: f32, curr: f32, looping: bool) -> Vec<AnimationEvent> {
        let mut events: Vec<AnimationEvent> = self
            .events
            .iter()
            .filter(|e| e.is_triggered(prev, curr, looping))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.priority.cmp(&a.priority));
        return events;
    }

    /// Calls `callback` for every triggered event, in batch order.
    pub fn process_events<F>(&self, prev: f32, curr: f32, looping: bool, mut callback: F)
    where
        F: FnMut(&AnimationEvent),
    {
        for event in self.triggered_events(prev, curr, looping).iter() {
            callback(event);
        }
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (idx, event) in self.events.iter().enumerate() {
            if event.name.is_empty() {
                errors.push(format!("Event {} has an empty name", idx));
            }
            if !event.is_time_valid() {
                errors.push(format!("Event '{}' has time {} outside [0, 1]", event.name, event.time));
            }
        }
        return errors;
    }
}

/// One entry of `AnimationEventHistory`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredEvent {
    pub event: AnimationEvent,
    /// Controller clock when the event fired.
    pub time: f32,
    /// Clip time (seconds) when the event fired.
    pub animation_time: f32,
    pub animation_name: String,
}

/// Bounded record of fired events, the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct AnimationEventHistory {
    entries: VecDeque<TriggeredEvent>,
    capacity: usize,
}

impl Default for AnimationEventHistory {
    fn default() -> AnimationEventHistory {
        return AnimationEventHistory::new(DEFAULT_EVENT_HISTORY_SIZE);
    }
}

impl AnimationEventHistory {
    pub fn new(capacity: usize) -> AnimationEventHistory {
        return AnimationEventHistory {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        };
    }

    pub fn push(&mut self, entry: TriggeredEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        return self.capacity;
    }

    /// Sets the capacity, evicting the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates from the oldest to the newest entry.
    pub fn iter(&self) -> impl Iterator<Item = &TriggeredEvent> {
        return self.entries.iter();
    }

    /// Gets up to `count` newest entries, oldest first.
    pub fn recent(&self, count: usize) -> Vec<TriggeredEvent> {
        let skip = self.entries.len().saturating_sub(count);
        return self.entries.iter().skip(skip).cloned().collect();
    }

    pub fn by_name(&self, name: &str) -> Vec<TriggeredEvent> {
        return self
            .entries
            .iter()
            .filter(|e| e.event.name == name)
            .cloned()
            .collect();
    }
}
