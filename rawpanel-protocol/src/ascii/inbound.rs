//! Inbound direction of the ASCII codec (controller -> panel lines).

use super::gfx::{encode_gfx_lines, parse_gfx_part, GfxAssembler};
use super::text::{decode_text_fields, encode_text_fields};
use super::{int_val, parse_id_list, strip_line_breaks, valid_id_list};
use crate::message::{
    Command, HwcColor, HwcExtended, HwcGfx, HwcMode, HwcState, HwcText, InboundFlow,
    InboundMessage, NetworkConfig, PublishRawAdcValues, Register, RegisterKind, RunMode,
};

/// Decodes inbound ASCII lines into messages.
///
/// The decoder owns the multi-line graphics reassembly state, so it must
/// live as long as the connection it reads from and must never be shared
/// between connections or directions.
#[derive(Debug, Default)]
pub struct InboundDecoder {
    gfx: GfxAssembler,
}

impl InboundDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the graphics reassembly state (e.g. after a reconnect).
    pub fn reset(&mut self) {
        self.gfx.reset();
    }

    /// Decodes a batch of lines. Lines matching no rule contribute nothing;
    /// the batch never fails as a whole.
    pub fn decode<S: AsRef<str>>(&mut self, lines: &[S]) -> Vec<InboundMessage> {
        let mut msgs = Vec::new();
        for line in lines {
            self.decode_line(line.as_ref(), &mut msgs);
        }
        msgs
    }

    fn decode_line(&mut self, line: &str, out: &mut Vec<InboundMessage>) {
        if line.is_empty() {
            return;
        }

        if let Some(msg) = decode_keyword(line) {
            out.push(msg);
            return;
        }

        if line.starts_with('{') {
            // A JSON object line is a single hardware-component state.
            match serde_json::from_str::<HwcState>(line) {
                Ok(state) => out.push(InboundMessage::state(state)),
                Err(err) => tracing::debug!(%err, "dropping malformed JSON state line"),
            }
            return;
        }
        if line.starts_with('[') {
            // A JSON array line is a full batch of messages.
            match serde_json::from_str::<Vec<InboundMessage>>(line) {
                Ok(msgs) => out.extend(msgs),
                Err(err) => tracing::debug!(%err, "dropping malformed JSON batch line"),
            }
            return;
        }

        if let Some(msg) = decode_component_state(line) {
            out.push(msg);
            return;
        }
        if let Some(part) = parse_gfx_part(line) {
            if let Some(state) = self.gfx.feed(part) {
                out.push(InboundMessage::state(state));
            }
            return;
        }
        if let Some(msg) = decode_single_setting(line)
            .or_else(|| decode_dual_setting(line))
            .or_else(|| decode_string_setting(line))
            .or_else(|| decode_register(line))
        {
            out.push(msg);
            return;
        }

        tracing::debug!(line, "unrecognized inbound line dropped");
    }
}

/// Fixed keyword table; first dispatch stage.
fn decode_keyword(line: &str) -> Option<InboundMessage> {
    let msg = match line {
        "ping" => InboundMessage::ping(),
        "ack" => InboundMessage::ack(),
        "nack" => InboundMessage {
            flow: InboundFlow::Nack,
            ..Default::default()
        },
        "ActivePanel=1" => InboundMessage::command(Command::ActivatePanel),
        "list" => InboundMessage::command(Command::SendPanelInfo),
        "map" => InboundMessage::command(Command::ReportHwcAvailability),
        "PanelTopology?" => InboundMessage::command(Command::SendPanelTopology),
        "BurninProfile?" => InboundMessage::command(Command::SendBurninProfile),
        "CalibrationProfile?" => InboundMessage::command(Command::SendCalibrationProfile),
        "NetworkConfig?" => InboundMessage::command(Command::SendNetworkConfig),
        "Registers?" => InboundMessage::command(Command::SendRegisters),
        "Connections?" => InboundMessage::command(Command::GetConnections),
        "RunTimeStats?" => InboundMessage::command(Command::GetRunTimeStats),
        "Clear" => InboundMessage::command(Command::ClearAll),
        "ClearLEDs" => InboundMessage::command(Command::ClearLeds),
        "ClearDisplays" => InboundMessage::command(Command::ClearDisplays),
        "SleepTimer?" => InboundMessage::command(Command::GetSleepTimeout),
        "WakeUp!" => InboundMessage::command(Command::WakeUp),
        "Reboot" => InboundMessage::command(Command::Reboot),
        _ => return None,
    };
    Some(msg)
}

/// `HWC#`/`HWCx#`/`HWCc#`/`HWCt#`/`HWCrawADCValues#` state commands.
fn decode_component_state(line: &str) -> Option<InboundMessage> {
    let prefix = ["HWC#", "HWCx#", "HWCc#", "HWCt#", "HWCrawADCValues#"]
        .into_iter()
        .find(|p| line.starts_with(p))?;
    let rest = line.strip_prefix(prefix)?;
    let (ids_str, value) = rest.split_once('=')?;
    if !valid_id_list(ids_str) {
        return None;
    }
    let ids = parse_id_list(ids_str);

    let mut state = HwcState {
        ids,
        ..Default::default()
    };
    match prefix {
        "HWC#" => state.mode = Some(HwcMode::from_wire(int_val(value) as u32)),
        "HWCx#" => state.extended = Some(HwcExtended::from_wire(int_val(value) as u32)),
        "HWCc#" => {
            let value = int_val(value) as u32;
            state.color = Some(if value & 0b100_0000 > 0 {
                super::color_from_wire(value)
            } else {
                HwcColor::Index { index: value & 0x1F }
            });
        }
        "HWCt#" => state.text = Some(decode_text_fields(value)),
        "HWCrawADCValues#" => {
            state.publish_raw_adc_values = Some(PublishRawAdcValues {
                enabled: int_val(value) == 1,
            })
        }
        _ => unreachable!(),
    }
    Some(InboundMessage::state(state))
}

/// Single-integer settings (`HeartBeatTimer=3000` and friends).
fn decode_single_setting(line: &str) -> Option<InboundMessage> {
    let (name, value) = line.split_once('=')?;
    if !super::all_digits(value) {
        return None;
    }
    let v: u32 = value.parse().ok()?;
    let command = match name {
        "HeartBeatTimer" => Command::SetHeartBeatTimer(v),
        "DimmedGain" => Command::SetDimmedGain(v),
        "PublishSystemStat" => Command::PublishSystemStat(v),
        "LoadCPU" => Command::LoadCpu(v),
        "SleepTimer" => Command::SetSleepTimeout(v),
        "SleepMode" => Command::SetSleepMode(v),
        "SleepScreenSaver" => Command::SetSleepScreenSaver(v),
        "Webserver" => Command::SetWebserverEnabled(v > 0),
        "JSONonOutbound" => Command::SetJsonFeedback(v > 0),
        // One value sets both brightness channels.
        "PanelBrightness" => Command::PanelBrightness { leds: v, oleds: v },
        _ => return None,
    };
    Some(InboundMessage::command(command))
}

/// `PanelBrightness=<leds>,<oleds>`.
fn decode_dual_setting(line: &str) -> Option<InboundMessage> {
    let rest = line.strip_prefix("PanelBrightness=")?;
    let (leds, oleds) = rest.split_once(',')?;
    if !super::all_digits(leds) || !super::all_digits(oleds) {
        return None;
    }
    Some(InboundMessage::command(Command::PanelBrightness {
        leds: leds.parse().ok()?,
        oleds: oleds.parse().ok()?,
    }))
}

/// String-valued settings.
fn decode_string_setting(line: &str) -> Option<InboundMessage> {
    let (name, value) = line.split_once('=')?;
    let command = match name {
        "SetCalibrationProfile" => Command::SetCalibrationProfile(value.to_string()),
        "SetNetworkConfig" => {
            let config: NetworkConfig = serde_json::from_str(value).ok()?;
            Command::SetNetworkConfig(config)
        }
        "SimulateEnvironmentalHealth" => match value {
            "Normal" => Command::SimulateEnvironmentalHealth(RunMode::Normal),
            "Safemode" => Command::SimulateEnvironmentalHealth(RunMode::Safemode),
            "Blocked" => Command::SimulateEnvironmentalHealth(RunMode::Blocked),
            _ => return None,
        },
        _ => return None,
    };
    Some(InboundMessage::command(command))
}

/// Register writes: `Mem<id>=`, `Flag#<id>=`, `Shift<id>=`, `State<id>=`.
fn decode_register(line: &str) -> Option<InboundMessage> {
    parse_register_line(line).map(|reg| InboundMessage {
        registers: vec![reg],
        ..Default::default()
    })
}

/// Shared with the outbound direction; the register grammar is identical.
pub(super) fn parse_register_line(line: &str) -> Option<Register> {
    let (prefix, kind) = [
        ("Flag#", RegisterKind::Flag),
        ("Mem", RegisterKind::Mem),
        ("Shift", RegisterKind::Shift),
        ("State", RegisterKind::State),
    ]
    .into_iter()
    .find(|(p, _)| line.starts_with(p))?;

    let rest = line.strip_prefix(prefix)?;
    let (id, value) = rest.split_once('=')?;
    if !id.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return None;
    }
    if !super::all_digits(value) {
        return None;
    }
    let value = int_val(value) as u32;
    Some(match kind {
        // Flag IDs are numeric and the value is a strict boolean.
        RegisterKind::Flag => Register {
            reg: kind,
            id: int_val(id).to_string(),
            value: u32::from(value > 0),
        },
        _ => Register {
            reg: kind,
            id: id.to_string(),
            value,
        },
    })
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes inbound messages into ASCII lines.
///
/// A state addressing several hardware components fans out into one line per
/// component per populated field (Raw Panel 1.0 compatibility: comma lists
/// are accepted on decode but never emitted).
pub fn encode_inbound(msgs: &[InboundMessage]) -> Vec<String> {
    let mut lines = Vec::new();
    for msg in msgs {
        match msg.flow {
            InboundFlow::Ack => lines.push("ack".to_string()),
            InboundFlow::Nack => lines.push("nack".to_string()),
            InboundFlow::Ping => lines.push("ping".to_string()),
            InboundFlow::None => {}
        }
        for command in &msg.commands {
            lines.push(encode_command(command));
        }
        for state in &msg.states {
            encode_state(state, &mut lines);
        }
        for register in &msg.registers {
            lines.push(encode_register_line(register));
        }
    }
    lines
}

fn encode_command(command: &Command) -> String {
    match command {
        Command::ActivatePanel => "ActivePanel=1".to_string(),
        Command::SendPanelInfo => "list".to_string(),
        Command::ReportHwcAvailability => "map".to_string(),
        Command::SendPanelTopology => "PanelTopology?".to_string(),
        Command::SendBurninProfile => "BurninProfile?".to_string(),
        Command::SendCalibrationProfile => "CalibrationProfile?".to_string(),
        Command::SendNetworkConfig => "NetworkConfig?".to_string(),
        Command::SendRegisters => "Registers?".to_string(),
        Command::GetConnections => "Connections?".to_string(),
        Command::GetRunTimeStats => "RunTimeStats?".to_string(),
        Command::ClearAll => "Clear".to_string(),
        Command::ClearLeds => "ClearLEDs".to_string(),
        Command::ClearDisplays => "ClearDisplays".to_string(),
        Command::GetSleepTimeout => "SleepTimer?".to_string(),
        Command::WakeUp => "WakeUp!".to_string(),
        Command::Reboot => "Reboot".to_string(),
        Command::PanelBrightness { leds, oleds } => format!("PanelBrightness={leds},{oleds}"),
        Command::SetSleepTimeout(v) => format!("SleepTimer={v}"),
        Command::SetSleepMode(v) => format!("SleepMode={v}"),
        Command::SetSleepScreenSaver(v) => format!("SleepScreenSaver={v}"),
        Command::SetDimmedGain(v) => format!("DimmedGain={v}"),
        Command::SetHeartBeatTimer(v) => format!("HeartBeatTimer={v}"),
        Command::PublishSystemStat(v) => format!("PublishSystemStat={v}"),
        Command::LoadCpu(v) => format!("LoadCPU={v}"),
        Command::SetWebserverEnabled(on) => format!("Webserver={}", u32::from(*on)),
        Command::SetJsonFeedback(on) => format!("JSONonOutbound={}", u32::from(*on)),
        Command::SetCalibrationProfile(json) => {
            format!("SetCalibrationProfile={}", strip_line_breaks(json))
        }
        Command::SetNetworkConfig(config) => format!(
            "SetNetworkConfig={}",
            serde_json::to_string(config).unwrap_or_default()
        ),
        Command::SimulateEnvironmentalHealth(mode) => format!(
            "SimulateEnvironmentalHealth={}",
            match mode {
                RunMode::Normal => "Normal",
                RunMode::Safemode => "Safemode",
                RunMode::Blocked => "Blocked",
            }
        ),
    }
}

fn encode_state(state: &HwcState, lines: &mut Vec<String>) {
    for &id in &state.ids {
        if let Some(mode) = &state.mode {
            lines.push(format!("HWC#{}={}", id, mode.to_wire()));
        }
        if let Some(color) = &state.color {
            let value = match color {
                HwcColor::Rgb { .. } => 0b1000_0000 | super::color_to_wire(color),
                HwcColor::Index { index } => 0b1000_0000 | (index & 0x1F),
            };
            lines.push(format!("HWCc#{id}={value}"));
        }
        if let Some(extended) = &state.extended {
            lines.push(format!("HWCx#{}={}", id, extended.to_wire()));
        }
        if let Some(text) = &state.text {
            if *text != HwcText::default() {
                lines.push(format!("HWCt#{}={}", id, encode_text_fields(text)));
            }
        }
        if let Some(gfx) = &state.gfx {
            if *gfx != HwcGfx::default() {
                encode_gfx_lines(gfx, id, lines);
            }
        }
        if let Some(publish) = &state.publish_raw_adc_values {
            lines.push(format!(
                "HWCrawADCValues#{}={}",
                id,
                u32::from(publish.enabled)
            ));
        }
    }
}

pub(super) fn encode_register_line(register: &Register) -> String {
    match register.reg {
        RegisterKind::Mem => format!("Mem{}={}", register.id, register.value),
        RegisterKind::Flag => format!("Flag#{}={}", register.id, register.value),
        RegisterKind::Shift => format!("Shift{}={}", register.id, register.value),
        RegisterKind::State => format!("State{}={}", register.id, register.value),
    }
}
