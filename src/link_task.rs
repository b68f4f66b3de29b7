//! # Link Driver
//!
//! Async driver that feeds a [`Link`] from embassy channels. The radio stack
//! pushes [`LinkEvent`]s into an [`InboundEventQueue`], the application
//! pushes whole messages into an [`OutgoingMessageQueue`], and the driver
//! handles whichever arrives first. When neither arrives within the poll
//! interval the step is idle. The link deadline is polled after every step.
//!
//! Events are handled to completion before the next one is taken, so the
//! link itself never sees concurrent calls.

use embassy_futures::select::{Either3, select3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Timer};
use log::{Level, log};

use crate::channels::LinkChannel;
use crate::tick::TickSource;
use crate::{Link, LinkError, LinkEvent, LinkHooks};

pub const INBOUND_EVENT_QUEUE_SIZE: usize = 16;
pub type InboundEventQueue<const N: usize> = Channel<CriticalSectionRawMutex, LinkEvent<N>, INBOUND_EVENT_QUEUE_SIZE>;
pub type InboundEventQueueReceiver<'a, const N: usize> = Receiver<'a, CriticalSectionRawMutex, LinkEvent<N>, INBOUND_EVENT_QUEUE_SIZE>;
pub type InboundEventQueueSender<'a, const N: usize> = Sender<'a, CriticalSectionRawMutex, LinkEvent<N>, INBOUND_EVENT_QUEUE_SIZE>;

/// Whole message handed to [`Link::transmit`], at most `M` bytes
pub type OutgoingMessage<const M: usize> = heapless::Vec<u8, M>;

pub const OUTGOING_MESSAGE_QUEUE_SIZE: usize = 4;
pub type OutgoingMessageQueue<const M: usize> = Channel<CriticalSectionRawMutex, OutgoingMessage<M>, OUTGOING_MESSAGE_QUEUE_SIZE>;
pub type OutgoingMessageQueueReceiver<'a, const M: usize> = Receiver<'a, CriticalSectionRawMutex, OutgoingMessage<M>, OUTGOING_MESSAGE_QUEUE_SIZE>;
pub type OutgoingMessageQueueSender<'a, const M: usize> = Sender<'a, CriticalSectionRawMutex, OutgoingMessage<M>, OUTGOING_MESSAGE_QUEUE_SIZE>;

/// Default wait for traffic before an idle step
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What a driver step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkActivity {
    /// An inbound event was dispatched
    Event,
    /// An outgoing message was transmitted
    Transmit,
    /// Nothing arrived within the poll interval
    Idle,
}

/// Runs one driver iteration
///
/// Waits for an inbound event, an outgoing message or the poll interval,
/// handles what arrived and then polls the link deadline.
///
/// # Errors
/// The error of [`Link::dispatch`] or [`Link::transmit`]. The deadline is
/// polled even when handling failed.
pub async fn link_step<C, T, H, const QUEUE: usize, const N: usize, const LINES: usize, const M: usize>(
    link: &mut Link<C, T, QUEUE, N, LINES>,
    hooks: &mut H,
    inbound_event_queue_receiver: InboundEventQueueReceiver<'_, N>,
    outgoing_message_queue_receiver: OutgoingMessageQueueReceiver<'_, M>,
    poll_interval: Duration,
) -> Result<LinkActivity, LinkError>
where
    C: LinkChannel,
    T: TickSource,
    H: LinkHooks,
{
    let result = match select3(
        inbound_event_queue_receiver.receive(),
        outgoing_message_queue_receiver.receive(),
        Timer::after(poll_interval),
    )
    .await
    {
        Either3::First(event) => link.dispatch(event, hooks).map(|_| LinkActivity::Event),
        Either3::Second(message) => {
            log::trace!("Transmitting outgoing message of {} bytes", message.len());
            link.transmit(&message).map(|_| LinkActivity::Transmit)
        }
        Either3::Third(_) => Ok(LinkActivity::Idle),
    };

    if link.poll_timeout(hooks) {
        log!(Level::Debug, "Link deadline expired");
    }
    result
}

/// Drives a link forever
///
/// Failures are logged and the loop carries on with the next event.
pub async fn link_task<C, T, H, const QUEUE: usize, const N: usize, const LINES: usize, const M: usize>(
    mut link: Link<C, T, QUEUE, N, LINES>,
    mut hooks: H,
    inbound_event_queue_receiver: InboundEventQueueReceiver<'_, N>,
    outgoing_message_queue_receiver: OutgoingMessageQueueReceiver<'_, M>,
    poll_interval: Duration,
) -> !
where
    C: LinkChannel,
    T: TickSource,
    H: LinkHooks,
{
    if let Err(error) = link.start() {
        log!(Level::Error, "Failed to publish initial line level: {}", error);
    }

    loop {
        if let Err(error) = link_step(
            &mut link,
            &mut hooks,
            inbound_event_queue_receiver,
            outgoing_message_queue_receiver,
            poll_interval,
        )
        .await
        {
            log!(Level::Warn, "Link step failed: {}", error);
        }
    }
}
