mod animation;
mod base;
mod blend_tree;
mod controller;
mod event;
mod math;
mod parameter;
mod pose;
mod skeleton;
mod skinning_job;
mod state_machine;
mod track;
mod transition;

pub mod test_utils;

pub use animation::{Animation, BonePose, BoneTrack, LoopMode};
pub use base::*;
pub use blend_tree::{AnimationSample, BlendMotion, BlendTree, BlendTreeNode, BlendTreeType};
pub use controller::{
    AnimationController, AnimationLayer, ControllerDebugInfo, EventCallback, LayerFade, MANUAL_TRIGGER_NAME,
};
pub use event::{AnimationEvent, AnimationEventHistory, AnimationEventManager, AnimationEventType, TriggeredEvent};
pub use parameter::{AnimationParameter, AnimationParameters, ParameterType};
pub use pose::{BoneTransform, Pose};
pub use skeleton::{RawBone, RawSkeleton, Skeleton};
pub use skinning_job::SkinningJob;
pub use state_machine::{
    AnimationState, AnimationStateMachine, StateCallback, StateChangeCallback, StateMachineDebugInfo, StateMotion,
    StateType, TransitionEnterPolicy, TransitionStartCallback,
};
pub use track::{Interpolation, Keyframe, Track, TrackValue};
pub use transition::{
    AnimationTransition, BlendCurveFn, BlendMode, ConditionFn, InterruptSource, TransitionBuilder, TransitionCallback,
    TransitionCondition, TransitionLogic, TransitionUpdateCallback, DEFAULT_FLOAT_TOLERANCE,
    DEFAULT_TRANSITION_DURATION,
};
