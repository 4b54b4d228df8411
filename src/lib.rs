// High-level overview:
//
// Protocol:              session (udp)            command (udp)                              hook
// Library Concept:  client <----------> session <---------------> node --> lights --> leds --------> output
//
// Implementing Binary:  lightnode-shell            lightnode (Handle)                          FrameLog / SharedFrames
//
// The session protocol binds one client and watches its liveness, the command
// protocol addresses individual lights. Every light fades its leds towards
// their targets on a 1ms tick until all channels have settled.

pub mod args;
pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod gamma;
pub mod handle;
pub mod layout;
pub mod led;
pub mod light;
pub mod node;
pub mod output;
pub mod packet;
pub mod session;
pub mod timer;

pub use config::{LightConfig, NodeConfig};
pub use handle::Handle;
pub use node::Node;
pub use output::{FrameLog, LightOutput, SharedFrames};
