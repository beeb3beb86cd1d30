// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data source abstraction.
//!
//! A [`Player`] is pulled for state snapshots by the delivery loop and
//! receives consumer requests (subscriptions, publishing, playback control).

use crate::mapping::GlobalVariables;
use crate::time::Time;
use crate::types::{AdvertiseOptions, PlayerState, PublishPayload, SubscribePayload};
use serde_json::Value;
use thiserror::Error;

/// Player errors.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player is closed")]
    Closed,

    #[error("Operation not supported by this player: {0}")]
    Unsupported(&'static str),

    #[error("Data source error: {0}")]
    Source(String),
}

/// A source of player state.
///
/// Write-direction capabilities are optional and default to
/// [`PlayerError::Unsupported`].
pub trait Player {
    /// Pull the next state snapshot.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    fn next_state(&mut self) -> Result<Option<PlayerState>, PlayerError>;

    /// Replace the set of topics the consumer wants to receive.
    fn set_subscriptions(&mut self, subscriptions: Vec<SubscribePayload>)
        -> Result<(), PlayerError>;

    /// Replace the set of topics the consumer intends to publish on.
    fn set_publishers(&mut self, _publishers: Vec<AdvertiseOptions>) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("set_publishers"))
    }

    /// Publish a message.
    fn publish(&mut self, _payload: PublishPayload) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("publish"))
    }

    /// Call a service and return its response.
    fn call_service(&mut self, _service: &str, _request: Value) -> Result<Value, PlayerError> {
        Err(PlayerError::Unsupported("call_service"))
    }

    /// Set a parameter on the source.
    fn set_parameter(&mut self, _key: &str, _value: Value) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("set_parameter"))
    }

    fn start_playback(&mut self) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("start_playback"))
    }

    fn pause_playback(&mut self) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("pause_playback"))
    }

    fn seek_playback(&mut self, _time: Time) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("seek_playback"))
    }

    /// Play until `time`, then pause.
    fn play_until(&mut self, _time: Time) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("play_until"))
    }

    fn set_playback_speed(&mut self, _speed: f64) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported("set_playback_speed"))
    }

    /// Notify the source of new global variable bindings.
    fn set_global_variables(&mut self, _variables: &GlobalVariables) -> Result<(), PlayerError> {
        Ok(())
    }

    /// Release the source.
    fn close(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }
}

impl<P: Player + ?Sized> Player for Box<P> {
    fn next_state(&mut self) -> Result<Option<PlayerState>, PlayerError> {
        (**self).next_state()
    }

    fn set_subscriptions(
        &mut self,
        subscriptions: Vec<SubscribePayload>,
    ) -> Result<(), PlayerError> {
        (**self).set_subscriptions(subscriptions)
    }

    fn set_publishers(&mut self, publishers: Vec<AdvertiseOptions>) -> Result<(), PlayerError> {
        (**self).set_publishers(publishers)
    }

    fn publish(&mut self, payload: PublishPayload) -> Result<(), PlayerError> {
        (**self).publish(payload)
    }

    fn call_service(&mut self, service: &str, request: Value) -> Result<Value, PlayerError> {
        (**self).call_service(service, request)
    }

    fn set_parameter(&mut self, key: &str, value: Value) -> Result<(), PlayerError> {
        (**self).set_parameter(key, value)
    }

    fn start_playback(&mut self) -> Result<(), PlayerError> {
        (**self).start_playback()
    }

    fn pause_playback(&mut self) -> Result<(), PlayerError> {
        (**self).pause_playback()
    }

    fn seek_playback(&mut self, time: Time) -> Result<(), PlayerError> {
        (**self).seek_playback(time)
    }

    fn play_until(&mut self, time: Time) -> Result<(), PlayerError> {
        (**self).play_until(time)
    }

    fn set_playback_speed(&mut self, speed: f64) -> Result<(), PlayerError> {
        (**self).set_playback_speed(speed)
    }

    fn set_global_variables(&mut self, variables: &GlobalVariables) -> Result<(), PlayerError> {
        (**self).set_global_variables(variables)
    }

    fn close(&mut self) -> Result<(), PlayerError> {
        (**self).close()
    }
}

/// Drain a player's states.
pub fn states<P: Player>(mut player: P) -> impl Iterator<Item = Result<PlayerState, PlayerError>> {
    std::iter::from_fn(move || match player.next_state() {
        Ok(Some(state)) => Some(Ok(state)),
        Ok(None) => None,
        Err(e) => Some(Err(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        states: VecDeque<PlayerState>,
    }

    impl Player for Scripted {
        fn next_state(&mut self) -> Result<Option<PlayerState>, PlayerError> {
            Ok(self.states.pop_front())
        }

        fn set_subscriptions(&mut self, _: Vec<SubscribePayload>) -> Result<(), PlayerError> {
            Ok(())
        }
    }

    #[test]
    fn test_optional_capabilities_unsupported() {
        let mut player = Scripted {
            states: VecDeque::new(),
        };
        assert!(matches!(
            player.publish(PublishPayload {
                topic: "/cmd".into(),
                msg: Value::Null,
            }),
            Err(PlayerError::Unsupported("publish"))
        ));
        assert!(player.start_playback().is_err());
        assert!(player.set_global_variables(&GlobalVariables::new()).is_ok());
    }

    #[test]
    fn test_states_drains_boxed_player() {
        let player: Box<dyn Player> = Box::new(Scripted {
            states: vec![PlayerState::default(), PlayerState::default()].into(),
        });
        let drained: Vec<_> = states(player).collect();
        assert_eq!(drained.len(), 2);
        assert!(drained.iter().all(|s| s.is_ok()));
    }
}
