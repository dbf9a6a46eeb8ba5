use serde_json::Value;

use crate::types::{Action, ParticipantId};

#[derive(Debug)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
        participant_id: Option<ParticipantId>,
        reconnect_token: Option<String>,
        room_id: Option<String>,
    },
    Action(Action),
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    let action = match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            let participant_id = match object.get("participantId") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            let reconnect_token = match object.get("reconnectToken") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            let room_id = match object.get("roomId") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            return Some(ParsedClientMessage::Hello {
                name,
                participant_id,
                reconnect_token,
                room_id,
            });
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            return Some(ParsedClientMessage::Ping { t });
        }
        "set_ready_to_start" => Action::SetReadyToStart,
        "submit_vote" => {
            let suspect_id = object.get("suspectId")?.as_str()?.to_string();
            let round = parse_round(object.get("round")?)?;
            Action::SubmitVote { suspect_id, round }
        }
        "finish_describing" => Action::FinishDescribing,
        "next_round" => Action::NextRound,
        "send_reaction" => {
            let emoji = object.get("emoji")?.as_str()?.to_string();
            Action::SendReaction { emoji }
        }
        "toggle_surrogates" => Action::ToggleSurrogates,
        "toggle_auto_advance" => Action::ToggleAutoAdvance,
        _ => return None,
    };
    Some(ParsedClientMessage::Action(action))
}

fn parse_round(value: &Value) -> Option<u32> {
    if let Some(number) = value.as_u64() {
        return u32::try_from(number).ok();
    }
    let number = value.as_f64()?;
    if !number.is_finite() || number < 0.0 || number.fract() != 0.0 || number > u32::MAX as f64 {
        return None;
    }
    Some(number as u32)
}
