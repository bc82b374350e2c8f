//! End-to-end runs of the probing engine: scripted probers for the
//! scheduling rules, loopback services for the built-in protocols.

mod probing;
mod protocols;
mod support;
