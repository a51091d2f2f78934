//! Outbound direction of the ASCII codec (panel -> controller lines).

use super::inbound::{encode_register_line, parse_register_line};
use super::{
    all_digits, int_val, strip_line_breaks, strip_line_breaks_svg, trim_explode,
};
use crate::message::{
    BurninProfile, CalibrationProfile, Connections, DimmedGain, EventKind, HeartBeatTimer,
    HwcEvent, NetworkConfig, OutboundFlow, OutboundMessage, PanelInfo, PanelTopology, PanelType,
    RawPanelSupport, RunMode, RunTimeStats, SleepState, SleepTimeout, SystemStat, TextMessage,
};

/// Decodes outbound ASCII lines into messages. This direction is stateless:
/// graphics transfers only travel inbound.
pub fn decode_outbound<S: AsRef<str>>(lines: &[S]) -> Vec<OutboundMessage> {
    let mut msgs = Vec::new();
    for line in lines {
        decode_line(line.as_ref(), &mut msgs);
    }
    msgs
}

fn decode_line(line: &str, out: &mut Vec<OutboundMessage>) {
    if line.is_empty() {
        return;
    }

    let flow = match line {
        "ping" => Some(OutboundFlow::Ping),
        "ack" => Some(OutboundFlow::Ack),
        "nack" => Some(OutboundFlow::Nack),
        "BSY" => Some(OutboundFlow::Bsy),
        "RDY" => Some(OutboundFlow::Rdy),
        "list" => Some(OutboundFlow::Hello),
        _ => None,
    };
    if let Some(flow) = flow {
        out.push(OutboundMessage {
            flow,
            ..Default::default()
        });
        return;
    }

    if let Some(msg) = decode_event(line)
        .or_else(|| decode_map(line))
        .or_else(|| decode_field(line))
        .or_else(|| decode_register(line))
    {
        out.push(msg);
        return;
    }

    tracing::debug!(line, "unrecognized outbound line dropped");
}

/// `HWC#<id>[.<edge>]=Down|Up|Press|Abs:v|Speed:v|Enc:v|Raw:v`.
fn decode_event(line: &str) -> Option<OutboundMessage> {
    let rest = line.strip_prefix("HWC#")?;
    let (addr, action) = rest.split_once('=')?;

    let (id_str, edge_str) = match addr.split_once('.') {
        Some((id, edge)) => (id, Some(edge)),
        None => (addr, None),
    };
    if !all_digits(id_str) {
        return None;
    }
    if let Some(edge) = edge_str {
        if !all_digits(edge) {
            return None;
        }
    }
    let id = int_val(id_str) as u32;
    let edge = edge_str.map_or(0, |e| int_val(e) as u32);

    let (kind_str, value_str) = match action.split_once(':') {
        Some((kind, value)) => (kind, Some(value)),
        None => (action, None),
    };
    if let Some(value) = value_str {
        let digits_or_sign = |b: u8| b.is_ascii_digit() || b == b'-';
        if value.is_empty() || !value.bytes().all(digits_or_sign) {
            return None;
        }
    }
    let value = value_str.map_or(0, int_val);

    let events = match kind_str {
        "Down" | "Up" => vec![HwcEvent {
            id,
            kind: EventKind::Binary {
                pressed: kind_str == "Down",
                edge,
            },
        }],
        // A press is a synthetic down+up pair.
        "Press" => vec![
            HwcEvent {
                id,
                kind: EventKind::Binary {
                    pressed: true,
                    edge,
                },
            },
            HwcEvent {
                id,
                kind: EventKind::Binary {
                    pressed: false,
                    edge,
                },
            },
        ],
        "Enc" => vec![HwcEvent {
            id,
            kind: EventKind::Pulsed {
                value: value as i32,
            },
        }],
        "Abs" => vec![HwcEvent {
            id,
            kind: EventKind::Absolute {
                value: value as u32,
            },
        }],
        "Speed" => vec![HwcEvent {
            id,
            kind: EventKind::Speed {
                value: value as i32,
            },
        }],
        "Raw" => vec![HwcEvent {
            id,
            kind: EventKind::RawAnalog {
                value: value as u32,
            },
        }],
        _ => return None,
    };

    Some(OutboundMessage {
        events,
        ..Default::default()
    })
}

/// `map=<origId>:<mappedId>`.
fn decode_map(line: &str) -> Option<OutboundMessage> {
    let rest = line.strip_prefix("map=")?;
    let (orig, mapped) = rest.split_once(':')?;
    if !all_digits(orig) || !all_digits(mapped) {
        return None;
    }
    let mut msg = OutboundMessage::default();
    msg.hwc_availability
        .insert(int_val(orig) as u32, int_val(mapped) as u32);
    Some(msg)
}

/// The `name=value` feedback fields (`_model=`, `_support=`, `SysStat=`, ...).
fn decode_field(line: &str) -> Option<OutboundMessage> {
    let (name, value) = line.split_once('=')?;
    if value.is_empty() {
        return None;
    }

    let mut msg = OutboundMessage::default();
    match name {
        "_model" => {
            msg.panel_info = Some(PanelInfo {
                model: value.to_string(),
                ..Default::default()
            })
        }
        "_serial" => {
            msg.panel_info = Some(PanelInfo {
                serial: value.to_string(),
                ..Default::default()
            })
        }
        "_version" => {
            msg.panel_info = Some(PanelInfo {
                software_version: value.to_string(),
                ..Default::default()
            })
        }
        "_platform" => {
            msg.panel_info = Some(PanelInfo {
                platform: value.to_string(),
                ..Default::default()
            })
        }
        "_bluePillReady" => {
            msg.panel_info = Some(PanelInfo {
                blue_pill_ready: int_val(value) != 0,
                ..Default::default()
            })
        }
        "_name" => {
            msg.panel_info = Some(PanelInfo {
                name: value.to_string(),
                ..Default::default()
            })
        }
        "_panelType" => {
            let panel_type = match value {
                "BPI" => PanelType::BluePillInside,
                "Physical" => PanelType::Physical,
                "Emulation" => PanelType::Emulation,
                "Touch" => PanelType::Touch,
                "Composite" => PanelType::Composite,
                _ => return None,
            };
            msg.panel_info = Some(PanelInfo {
                panel_type,
                ..Default::default()
            });
        }
        "_support" => {
            msg.panel_info = Some(PanelInfo {
                support: Some(decode_support(value)),
                ..Default::default()
            })
        }
        "_serverModeLockToIP" => {
            msg.panel_info = Some(PanelInfo {
                locked_to_ips: trim_explode(value, ';'),
                ..Default::default()
            })
        }
        "_serverModeMaxClients" => {
            msg.panel_info = Some(PanelInfo {
                max_clients: int_val(value) as u32,
                ..Default::default()
            })
        }
        "_isSleeping" => {
            msg.sleep_state = Some(SleepState {
                is_sleeping: int_val(value) != 0,
            })
        }
        "_sleepTimer" => {
            msg.sleep_timeout = Some(SleepTimeout {
                value: int_val(value) as u32,
            })
        }
        "_panelTopology_svgbase" => {
            msg.panel_topology = Some(PanelTopology {
                svgbase: value.to_string(),
                ..Default::default()
            })
        }
        "_panelTopology_HWC" => {
            msg.panel_topology = Some(PanelTopology {
                json: value.to_string(),
                ..Default::default()
            })
        }
        "_burninProfile" => {
            msg.burnin_profile = Some(BurninProfile {
                json: value.to_string(),
            })
        }
        "_networkConfig" => {
            let config: NetworkConfig = serde_json::from_str(value).ok()?;
            msg.network_config = Some(config);
        }
        "_calibrationProfile" => {
            msg.calibration_profile = Some(CalibrationProfile {
                json: value.to_string(),
            })
        }
        "_defaultCalibrationProfile" => {
            msg.default_calibration_profile = Some(CalibrationProfile {
                json: value.to_string(),
            })
        }
        "_heartBeatTimer" => {
            msg.heartbeat_timer = Some(HeartBeatTimer {
                value: int_val(value) as u32,
            })
        }
        "DimmedGain" => {
            msg.dimmed_gain = Some(DimmedGain {
                value: int_val(value) as u32,
            })
        }
        "_connections" => {
            msg.connections = Some(Connections {
                connection: trim_explode(value, ';'),
            })
        }
        "_bootsCount" => {
            msg.runtime_stats = Some(RunTimeStats {
                boots_count: int_val(value) as u32,
                ..Default::default()
            })
        }
        "_totalUptimeMin" => {
            msg.runtime_stats = Some(RunTimeStats {
                total_uptime: int_val(value) as u32,
                ..Default::default()
            })
        }
        "_sessionUptimeMin" => {
            msg.runtime_stats = Some(RunTimeStats {
                session_uptime: int_val(value) as u32,
                ..Default::default()
            })
        }
        "_screenSaverOnMin" => {
            msg.runtime_stats = Some(RunTimeStats {
                screen_save_on_time: int_val(value) as u32,
                ..Default::default()
            })
        }
        "ErrorMsg" => {
            msg.error_message = Some(TextMessage {
                message: value.to_string(),
            })
        }
        "Msg" => {
            msg.message = Some(TextMessage {
                message: value.to_string(),
            })
        }
        "EnvironmentalHealth" => {
            msg.environmental_health = Some(match value {
                "Normal" => RunMode::Normal,
                "Safemode" => RunMode::Safemode,
                "Blocked" => RunMode::Blocked,
                _ => return None,
            })
        }
        "SysStat" => msg.sys_stat = Some(decode_sys_stat(value)),
        _ => return None,
    }
    Some(msg)
}

/// Capability flags in any order; unknown names are ignored.
fn decode_support(value: &str) -> RawPanelSupport {
    let mut support = RawPanelSupport::default();
    for part in value.split(',') {
        match part {
            "ASCII" => support.ascii = true,
            "Binary" => support.binary = true,
            "JSONFeedback" => support.json_feedback = true,
            "JSONonInbound" => support.json_on_inbound = true,
            "JSONonOutbound" => support.json_on_outbound = true,
            "System" => support.system = true,
            "RawADCValues" => support.raw_adc_values = true,
            "BurninProfile" => support.burnin_profile = true,
            "EnvHealth" => support.env_health = true,
            "Registers" => support.registers = true,
            "Calibration" => support.calibration = true,
            "Processors" => support.processors = true,
            "NetworkSettings" => support.network_settings = true,
            _ => {}
        }
    }
    support
}

/// `key:value` pairs in any order. Every adjacent pair is probed; values are
/// numbers and never collide with the key names.
fn decode_sys_stat(value: &str) -> SystemStat {
    let parts: Vec<&str> = value.split(':').collect();
    let mut stat = SystemStat::default();
    for pair in parts.windows(2) {
        let v = pair[1];
        let float = || v.trim().parse::<f32>().unwrap_or(0.0);
        match pair[0] {
            "CPUUsage" => stat.cpu_usage = int_val(v) as u32,
            "CPUTemp" => stat.cpu_temp = float(),
            "ExtTemp" => stat.ext_temp = float(),
            "CPUVoltage" => stat.cpu_voltage = float(),
            "CPUFreqCurrent" => stat.cpu_freq_current = int_val(v) as i32,
            "CPUFreqMin" => stat.cpu_freq_min = int_val(v) as i32,
            "CPUFreqMax" => stat.cpu_freq_max = int_val(v) as i32,
            "MemTotal" => stat.mem_total = int_val(v) as i32,
            "MemFree" => stat.mem_free = int_val(v) as i32,
            "MemAvailable" => stat.mem_available = int_val(v) as i32,
            "MemBuffers" => stat.mem_buffers = int_val(v) as i32,
            "MemCached" => stat.mem_cached = int_val(v) as i32,
            "UnderVoltageNow" => stat.under_voltage_now = int_val(v) == 1,
            "UnderVoltage" => stat.under_voltage = int_val(v) == 1,
            "FreqCapNow" => stat.freq_cap_now = int_val(v) == 1,
            "FreqCap" => stat.freq_cap = int_val(v) == 1,
            "ThrottledNow" => stat.throttled_now = int_val(v) == 1,
            "Throttled" => stat.throttled = int_val(v) == 1,
            "SoftTempLimitNow" => stat.soft_temp_limit_now = int_val(v) == 1,
            "SoftTempLimit" => stat.soft_temp_limit = int_val(v) == 1,
            _ => {}
        }
    }
    stat
}

fn decode_register(line: &str) -> Option<OutboundMessage> {
    parse_register_line(line).map(|reg| OutboundMessage {
        registers: vec![reg],
        ..Default::default()
    })
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes outbound messages into ASCII lines, one line per populated record
/// (and one per event/register/availability entry).
pub fn encode_outbound(msgs: &[OutboundMessage]) -> Vec<String> {
    let mut lines = Vec::new();
    for msg in msgs {
        match msg.flow {
            OutboundFlow::Ack => lines.push("ack".to_string()),
            OutboundFlow::Nack => lines.push("nack".to_string()),
            OutboundFlow::Ping => lines.push("ping".to_string()),
            OutboundFlow::Bsy => lines.push("BSY".to_string()),
            OutboundFlow::Rdy => lines.push("RDY".to_string()),
            OutboundFlow::Hello => lines.push("list".to_string()),
            OutboundFlow::None => {}
        }

        if let Some(info) = &msg.panel_info {
            encode_panel_info(info, &mut lines);
        }
        if let Some(topology) = &msg.panel_topology {
            lines.push(format!(
                "_panelTopology_svgbase={}",
                strip_line_breaks_svg(&topology.svgbase)
            ));
            lines.push(format!(
                "_panelTopology_HWC={}",
                strip_line_breaks(&topology.json)
            ));
        }
        if let Some(profile) = &msg.burnin_profile {
            lines.push(format!("_burninProfile={}", strip_line_breaks(&profile.json)));
        }
        if let Some(config) = &msg.network_config {
            lines.push(format!(
                "_networkConfig={}",
                serde_json::to_string(config).unwrap_or_default()
            ));
        }
        if let Some(profile) = &msg.calibration_profile {
            lines.push(format!(
                "_calibrationProfile={}",
                strip_line_breaks(&profile.json)
            ));
        }
        if let Some(profile) = &msg.default_calibration_profile {
            lines.push(format!(
                "_defaultCalibrationProfile={}",
                strip_line_breaks(&profile.json)
            ));
        }
        if let Some(timeout) = &msg.sleep_timeout {
            lines.push(format!("_sleepTimer={}", timeout.value));
        }
        if let Some(state) = &msg.sleep_state {
            lines.push(format!("_isSleeping={}", u32::from(state.is_sleeping)));
        }
        if let Some(timer) = &msg.heartbeat_timer {
            lines.push(format!("_heartBeatTimer={}", timer.value));
        }
        if let Some(gain) = &msg.dimmed_gain {
            lines.push(format!("DimmedGain={}", gain.value));
        }
        if let Some(connections) = &msg.connections {
            lines.push(format!("_connections={}", connections.connection.join(";")));
        }
        if let Some(stats) = &msg.runtime_stats {
            if stats.boots_count > 0 {
                lines.push(format!("_bootsCount={}", stats.boots_count));
            }
            if stats.total_uptime > 0 {
                lines.push(format!("_totalUptimeMin={}", stats.total_uptime));
            }
            if stats.session_uptime > 0 {
                lines.push(format!("_sessionUptimeMin={}", stats.session_uptime));
            }
            if stats.screen_save_on_time > 0 {
                lines.push(format!("_screenSaverOnMin={}", stats.screen_save_on_time));
            }
        }
        if let Some(error) = &msg.error_message {
            lines.push(format!("ErrorMsg={}", strip_line_breaks(&error.message)));
        }
        if let Some(message) = &msg.message {
            lines.push(format!("Msg={}", strip_line_breaks(&message.message)));
        }
        for (orig, mapped) in &msg.hwc_availability {
            lines.push(format!("map={orig}:{mapped}"));
        }
        if let Some(mode) = &msg.environmental_health {
            lines.push(format!(
                "EnvironmentalHealth={}",
                match mode {
                    RunMode::Normal => "Normal",
                    RunMode::Safemode => "Safemode",
                    RunMode::Blocked => "Blocked",
                }
            ));
        }
        if let Some(stat) = &msg.sys_stat {
            lines.push(encode_sys_stat(stat));
        }
        for event in &msg.events {
            lines.push(encode_event(event));
        }
        for register in &msg.registers {
            lines.push(encode_register_line(register));
        }
    }
    lines
}

fn encode_panel_info(info: &PanelInfo, lines: &mut Vec<String>) {
    if !info.model.is_empty() {
        lines.push(format!("_model={}", info.model));
    }
    if !info.serial.is_empty() {
        lines.push(format!("_serial={}", info.serial));
    }
    if !info.software_version.is_empty() {
        lines.push(format!("_version={}", info.software_version));
    }
    if !info.name.is_empty() {
        lines.push(format!("_name={}", info.name));
    }
    if !info.platform.is_empty() {
        lines.push(format!("_platform={}", info.platform));
    }
    if info.blue_pill_ready {
        lines.push("_bluePillReady=1".to_string());
    }
    if info.max_clients > 0 {
        lines.push(format!("_serverModeMaxClients={}", info.max_clients));
    }
    if !info.locked_to_ips.is_empty() {
        lines.push(format!(
            "_serverModeLockToIP={}",
            info.locked_to_ips.join(";")
        ));
    }
    match info.panel_type {
        PanelType::Unknown => {}
        PanelType::BluePillInside => lines.push("_panelType=BPI".to_string()),
        PanelType::Physical => lines.push("_panelType=Physical".to_string()),
        PanelType::Emulation => lines.push("_panelType=Emulation".to_string()),
        PanelType::Touch => lines.push("_panelType=Touch".to_string()),
        PanelType::Composite => lines.push("_panelType=Composite".to_string()),
    }
    if let Some(support) = &info.support {
        lines.push(encode_support(support));
    }
}

/// Canonical flag order; decode order is not preserved.
fn encode_support(support: &RawPanelSupport) -> String {
    let flags = [
        (support.ascii, "ASCII"),
        (support.binary, "Binary"),
        (support.json_feedback, "JSONFeedback"),
        (support.json_on_inbound, "JSONonInbound"),
        (support.json_on_outbound, "JSONonOutbound"),
        (support.system, "System"),
        (support.raw_adc_values, "RawADCValues"),
        (support.burnin_profile, "BurninProfile"),
        (support.env_health, "EnvHealth"),
        (support.registers, "Registers"),
        (support.calibration, "Calibration"),
        (support.processors, "Processors"),
        (support.network_settings, "NetworkSettings"),
    ];
    let names: Vec<&str> = flags
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
    format!("_support={}", names.join(","))
}

fn encode_sys_stat(stat: &SystemStat) -> String {
    let flag = |b: bool| u32::from(b);
    format!(
        "SysStat=CPUUsage:{}:CPUTemp:{:.1}:ExtTemp:{:.1}:CPUVoltage:{:.2}:\
         CPUFreqCurrent:{}:CPUFreqMin:{}:CPUFreqMax:{}:\
         MemTotal:{}:MemFree:{}:MemAvailable:{}:MemBuffers:{}:MemCached:{}:\
         UnderVoltageNow:{}:UnderVoltage:{}:FreqCapNow:{}:FreqCap:{}:\
         ThrottledNow:{}:Throttled:{}:SoftTempLimitNow:{}:SoftTempLimit:{}:",
        stat.cpu_usage,
        stat.cpu_temp,
        stat.ext_temp,
        stat.cpu_voltage,
        stat.cpu_freq_current,
        stat.cpu_freq_min,
        stat.cpu_freq_max,
        stat.mem_total,
        stat.mem_free,
        stat.mem_available,
        stat.mem_buffers,
        stat.mem_cached,
        flag(stat.under_voltage_now),
        flag(stat.under_voltage),
        flag(stat.freq_cap_now),
        flag(stat.freq_cap),
        flag(stat.throttled_now),
        flag(stat.throttled),
        flag(stat.soft_temp_limit_now),
        flag(stat.soft_temp_limit),
    )
}

fn encode_event(event: &HwcEvent) -> String {
    match &event.kind {
        EventKind::Binary { pressed, edge } => {
            let edge_part = if *edge > 0 {
                format!(".{edge}")
            } else {
                String::new()
            };
            format!(
                "HWC#{}{}={}",
                event.id,
                edge_part,
                if *pressed { "Down" } else { "Up" }
            )
        }
        EventKind::Pulsed { value } => format!("HWC#{}=Enc:{}", event.id, value),
        EventKind::Absolute { value } => format!("HWC#{}=Abs:{}", event.id, value),
        EventKind::Speed { value } => format!("HWC#{}=Speed:{}", event.id, value),
        EventKind::RawAnalog { value } => format!("HWC#{}=Raw:{}", event.id, value),
    }
}
