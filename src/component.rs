//! Defines the Component trait, to be used by each DepthChime processing
//! stage. This enforces a common interface between stages, so that each
//! stage can consume data from the preceding stage on its own thread,
//! process it, and pass new data on to the next one.

use crate::error::SonifyError;

use log::{info, warn};
use std::fmt;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

///
/// A stage of the sensor-delivery path, such as turning depth frames into
/// proximity vectors or recording those vectors to disk. Anything that should
/// run off the playback thread implements Component, so it can be spawned
/// with [run_component].
///
pub trait Component: fmt::Display {
    /// What the stage consumes
    type InData;
    /// What the stage produces
    type OutData;

    /// Converts one input into one output
    fn convert(&mut self, input: Self::InData) -> Self::OutData;

    /// Cleans up once the input channel has closed
    fn finalize(&mut self) -> Result<(), SonifyError>;
}

/// Runs the given Component on its own thread. On receiving data of type
/// InData on the input channel, the Component converts them to data of type
/// OutData and sends it to the output channel. The thread finalizes the
/// Component and exits when the input channel closes.
pub fn run_component<C: Component + Send + 'static>(
    mut component: Box<C>,
    input: Receiver<<C as Component>::InData>,
    output: Sender<<C as Component>::OutData>,
) -> JoinHandle<()>
where
    <C as Component>::InData: Send + 'static,
    <C as Component>::OutData: Send + 'static,
{
    thread::spawn(move || {
        while let Ok(data) = input.recv() {
            let out_data = component.convert(data);
            if let Err(error) = output.send(out_data) {
                warn!("{} : received error {}.", component, error);
            }
        }

        if let Err(component_error) = component.finalize() {
            warn!("{} : error during terminating : {}.", component, component_error);
        }
        info!("{} : terminated.", component);
    })
}
