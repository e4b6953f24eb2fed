//! Helpdesk Control - command line front end for bulk ticket creation.

pub mod commands;
pub mod display;
