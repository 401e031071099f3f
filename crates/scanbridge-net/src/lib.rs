// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanbridge-net: Everything that talks to the device over the network: the
// SNMP menu advertiser on the way out, the button-event listener on the way
// in, and the bounded queue handing decoded commands to the scan side.

pub mod advertiser;
pub mod listener;
pub mod protocol;
pub mod queue;
pub mod snmp;

pub use advertiser::{Advertiser, MenuTransport};
pub use listener::{CommandFilter, CommandListener, Disposition, SequenceTracker};
pub use queue::{CommandReceiver, CommandSender, Submit, command_queue};
pub use snmp::SnmpClient;
