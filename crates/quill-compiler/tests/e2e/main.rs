//! End-to-end tests: compile hand-built module trees and evaluate them.


mod dynamic;
mod exceptions;
mod functions;
mod loops;
mod variables;
