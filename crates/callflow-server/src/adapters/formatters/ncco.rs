//! NCCO formatter
//!
//! Serializes provider-neutral instructions into Vonage's Call Control
//! Object format.

use serde_json::{json, Value};

use callflow::Instruction;

/// Convert an instruction list into an NCCO array
pub fn to_ncco(instructions: &[Instruction]) -> Vec<Value> {
    instructions.iter().map(format_instruction).collect()
}

fn format_instruction(instruction: &Instruction) -> Value {
    match instruction {
        Instruction::Speak {
            text,
            voice,
            language,
        } => {
            let mut action = json!({ "action": "talk", "text": text });
            if let Some(language) = language {
                action["language"] = json!(language);
            }
            if let Some(voice) = voice {
                action["voiceName"] = json!(voice);
            }
            action
        }
        Instruction::CollectInput {
            max_digits,
            timeout_seconds,
            callback_url,
        } => json!({
            "action": "input",
            "type": ["dtmf"],
            "dtmf": {
                "maxDigits": max_digits,
                "timeOut": timeout_seconds,
            },
            "eventUrl": [callback_url],
        }),
        Instruction::Record { callback_url } => json!({
            "action": "record",
            "eventUrl": [callback_url],
            "endOnSilence": 3,
            "format": "mp3",
        }),
        Instruction::Transfer { number } => json!({
            "action": "connect",
            "endpoint": [{ "type": "phone", "number": number }],
        }),
    }
}
