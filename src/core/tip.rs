/// Tap hint — a sprite that blinks for as long as the scene is up.
///
/// The sprite holds full opacity for a delay, then fades back and forth
/// between 1 and 0. Every leg is a tracked fade, so closing the scope ends
/// the loop.

use std::time::Duration;
use tracing::debug;

use crate::core::scope::{CallbackScope, TicketKind};
use crate::core::stage::{Fade, NodeId, Signal, Stage, Ticket};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Blink {
    Idle,
    Delayed(Ticket),
    Fading { ticket: Ticket, to: f32 },
}

#[derive(Debug, Clone)]
pub struct TipBlinker {
    sprite: NodeId,
    delay: Duration,
    leg: Duration,
    blink: Blink,
}

impl TipBlinker {
    pub fn new(sprite: NodeId, delay: Duration, leg: Duration) -> Self {
        Self {
            sprite,
            delay,
            leg,
            blink: Blink::Idle,
        }
    }

    pub fn sprite(&self) -> NodeId {
        self.sprite
    }

    pub fn is_running(&self) -> bool {
        self.blink != Blink::Idle
    }

    pub fn start<S: Stage + ?Sized>(&mut self, stage: &mut S, scope: &mut CallbackScope) {
        if self.is_running() {
            return;
        }
        stage.set_opacity(self.sprite, 1.0);
        let ticket = stage.schedule(self.delay);
        scope.track(ticket, TicketKind::Timer);
        self.blink = Blink::Delayed(ticket);
    }

    /// Start the next leg if `signal` ended the current one. Returns false
    /// for signals that belong to something else.
    pub fn on_signal<S: Stage + ?Sized>(
        &mut self,
        signal: Signal,
        stage: &mut S,
        scope: &mut CallbackScope,
    ) -> bool {
        let to = match (self.blink, signal) {
            (Blink::Delayed(expected), Signal::TimerFired(t)) if expected == t => 0.0,
            (Blink::Fading { ticket, to }, Signal::FadeFinished(t)) if ticket == t => 1.0 - to,
            _ => return false,
        };
        let ticket = stage.fade(Fade::from_to(self.sprite, 1.0 - to, to, self.leg));
        scope.track(ticket, TicketKind::Fade);
        self.blink = Blink::Fading { ticket, to };
        debug!(to, "tip blink leg");
        true
    }

    pub fn stop(&mut self) {
        self.blink = Blink::Idle;
    }
}
