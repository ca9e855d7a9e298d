//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements   | Connects to                 |
//! |----------------|--------------|-----------------------------|
//! | `command_link` | CommandPort  | UDP command port on the rig |
//! | `console_sink` | SnapshotSink | Standard output             |
//! | `time`         | ClockPort    | System wall clock           |

pub mod command_link;
pub mod console_sink;
pub mod time;
