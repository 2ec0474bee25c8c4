use std::sync::{Arc, LazyLock};

use bevy::prelude::*;
use parking_lot::Mutex;
use ribbit_bits::{BitDuration, BitMessage, BitParameters, BitResult, RibbitMessage};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use web_sys::MessageEvent;

/// Messages received from Ribbit, drained once per frame.
pub static RIBBIT_MESSAGE_QUEUE: LazyLock<Arc<Mutex<Vec<RibbitMessage>>>> =
    LazyLock::new(|| Arc::new(Mutex::new(Vec::new())));

#[cfg(target_arch = "wasm32")]
pub fn listen_ribbit_messages() {
    let Some(window) = web_sys::window() else {
        error!("No global window, Ribbit messages will not be received");
        return;
    };
    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        let message: Result<RibbitMessage, serde_wasm_bindgen::Error> =
            serde_wasm_bindgen::from_value(event.data());

        let Ok(message) = message else {
            error!("Could not parse ribbit message {:?}", &event.data());
            return;
        };

        RIBBIT_MESSAGE_QUEUE.lock().push(message);
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Err(err) =
        window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
    {
        error!("Failed to listen for Ribbit messages: {err:?}");
        return;
    }

    // The listener lives as long as the page.
    closure.forget();
}

/// Without a Ribbit parent window the message is only logged.
#[cfg(not(target_arch = "wasm32"))]
pub fn send_bit_message(message: BitMessage) {
    info!("Bit message: {message:?}");
}

#[cfg(target_arch = "wasm32")]
pub fn send_bit_message(message: BitMessage) {
    let Some(window) = web_sys::window() else {
        error!("{message:?} not sent, no global window.");
        return;
    };
    let Ok(message_str) = serde_wasm_bindgen::to_value(&message) else {
        error!("Could not serialize {message:?}");
        return;
    };

    let Ok(Some(parent_window)) = window.parent() else {
        error!("{message:?} not sent, parent_window not found.");
        return;
    };

    if let Err(err) = parent_window.post_message(&message_str, "*") {
        error!("Could not post message {message_str:?}. {err:?}");
    };
}

/// Answers the messages Ribbit sends to a bit.
///
/// These are called by the communication plugin, never by the bit itself.
pub trait RibbitMessageHandler: Send + Sync + Default + 'static {
    fn duration(world: &mut World) -> BitDuration;
    fn end(world: &mut World) -> BitResult;
    fn restart(world: &mut World);

    /// The player started the bit from Ribbit.
    fn start(_world: &mut World) {}
}

fn process_ribbit_messages<T: RibbitMessageHandler>(world: &mut World) {
    let messages = RIBBIT_MESSAGE_QUEUE.lock().drain(..).collect::<Vec<_>>();

    for message in messages {
        match message {
            RibbitMessage::End => {
                let result = T::end(world);
                send_bit_message(BitMessage::End(result));
            }
            RibbitMessage::Parameters => {
                let duration = T::duration(world);
                let parameters = BitParameters { duration };
                send_bit_message(BitMessage::Parameters(parameters));
            }
            RibbitMessage::Restart => T::restart(world),
            RibbitMessage::Start => T::start(world),
        }
    }
}

fn ready() {
    send_bit_message(BitMessage::Ready);
}

#[derive(Default)]
pub struct RibbitCommunicationPlugin<T: RibbitMessageHandler>(core::marker::PhantomData<T>);

impl<T: RibbitMessageHandler> Plugin for RibbitCommunicationPlugin<T> {
    fn build(&self, app: &mut App) {
        app.add_systems(PostUpdate, process_ribbit_messages::<T>);
        #[cfg(target_arch = "wasm32")]
        {
            app.add_systems(Startup, listen_ribbit_messages);
        }
        app.add_systems(PostStartup, ready);
    }
}
