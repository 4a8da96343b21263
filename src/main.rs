//! Binary entrypoint for the chatbot API server.

use std::process::ExitCode;

use chatbot_api::start_chatbot;

fn main() -> ExitCode {
    start_chatbot::run()
}
