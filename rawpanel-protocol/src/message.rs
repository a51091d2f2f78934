//! Typed message model for the Raw Panel protocol.
//!
//! `InboundMessage` travels controller -> panel (state updates, commands),
//! `OutboundMessage` travels panel -> controller (events, telemetry, panel
//! identity). Field names follow the wire vocabulary of the protocol's JSON
//! forms (`HWCIDs`, `HWCMode`, ...), so the same serde model backs both the
//! ASCII JSON lines and the binary frame payload.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flow control signals carried by inbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InboundFlow {
    #[default]
    None,
    Ping,
    Ack,
    Nack,
}

impl InboundFlow {
    pub fn is_none(&self) -> bool {
        matches!(self, InboundFlow::None)
    }
}

/// Flow control signals carried by outbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutboundFlow {
    #[default]
    None,
    Ping,
    Ack,
    Nack,
    /// Panel is busy; feedback should be throttled.
    Bsy,
    /// Panel is ready again after BSY.
    Rdy,
    /// Panel requests the controller to identify itself.
    Hello,
}

impl OutboundFlow {
    pub fn is_none(&self) -> bool {
        matches!(self, OutboundFlow::None)
    }
}

/// A control request from the controller to the panel.
///
/// One message may carry several commands; each decodes from / encodes to
/// exactly one ASCII line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// `ActivePanel=1` - marks the controller as the active client.
    ActivatePanel,
    /// `list` - request panel identity fields.
    SendPanelInfo,
    /// `map` - request the HWC availability map.
    ReportHwcAvailability,
    /// `PanelTopology?`
    SendPanelTopology,
    /// `BurninProfile?`
    SendBurninProfile,
    /// `CalibrationProfile?`
    SendCalibrationProfile,
    /// `NetworkConfig?`
    SendNetworkConfig,
    /// `Registers?`
    SendRegisters,
    /// `Connections?`
    GetConnections,
    /// `RunTimeStats?`
    GetRunTimeStats,
    /// `Clear` - clear both LEDs and displays.
    ClearAll,
    /// `ClearLEDs`
    ClearLeds,
    /// `ClearDisplays`
    ClearDisplays,
    /// `SleepTimer?`
    GetSleepTimeout,
    /// `WakeUp!`
    WakeUp,
    /// `Reboot`
    Reboot,
    /// `PanelBrightness=<leds>,<oleds>` (a single-value form applies the
    /// same level to both channels).
    PanelBrightness { leds: u32, oleds: u32 },
    /// `SleepTimer=<ms>`
    SetSleepTimeout(u32),
    /// `SleepMode=<mode>`
    SetSleepMode(u32),
    /// `SleepScreenSaver=<type>`
    SetSleepScreenSaver(u32),
    /// `DimmedGain=<gain>`
    SetDimmedGain(u32),
    /// `HeartBeatTimer=<ms>`
    SetHeartBeatTimer(u32),
    /// `PublishSystemStat=<period sec>`
    PublishSystemStat(u32),
    /// `LoadCPU=<level>` - ask the panel to simulate CPU load.
    LoadCpu(u32),
    /// `Webserver=<0|1>`
    SetWebserverEnabled(bool),
    /// `JSONonOutbound=<0|1>` - switch the panel's outbound feedback to JSON.
    SetJsonFeedback(bool),
    /// `SetCalibrationProfile=<json>` - raw JSON, opaque to this crate.
    SetCalibrationProfile(String),
    /// `SetNetworkConfig=<json>`
    SetNetworkConfig(NetworkConfig),
    /// `SimulateEnvironmentalHealth=Normal|Safemode|Blocked`
    SimulateEnvironmentalHealth(RunMode),
}

/// Environmental run mode reported or simulated on a panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    Normal,
    Safemode,
    Blocked,
}

/// Panel network settings, exchanged as a JSON blob on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(rename = "DHCP")]
    pub dhcp: bool,
    #[serde(rename = "StaticIP", skip_serializing_if = "String::is_empty")]
    pub static_ip: String,
    #[serde(rename = "StaticSubnetMask", skip_serializing_if = "String::is_empty")]
    pub static_subnet_mask: String,
    #[serde(rename = "StaticGateway", skip_serializing_if = "String::is_empty")]
    pub static_gateway: String,
    #[serde(rename = "StaticDNS", skip_serializing_if = "String::is_empty")]
    pub static_dns: String,
}

/// Controller -> panel message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    #[serde(rename = "FlowMessage", skip_serializing_if = "InboundFlow::is_none")]
    pub flow: InboundFlow,

    #[serde(rename = "Commands", skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,

    #[serde(rename = "States", skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<HwcState>,

    #[serde(rename = "Registers", skip_serializing_if = "Vec::is_empty")]
    pub registers: Vec<Register>,
}

impl InboundMessage {
    pub fn ping() -> Self {
        Self {
            flow: InboundFlow::Ping,
            ..Default::default()
        }
    }

    pub fn ack() -> Self {
        Self {
            flow: InboundFlow::Ack,
            ..Default::default()
        }
    }

    pub fn command(command: Command) -> Self {
        Self {
            commands: vec![command],
            ..Default::default()
        }
    }

    pub fn state(state: HwcState) -> Self {
        Self {
            states: vec![state],
            ..Default::default()
        }
    }

    /// An empty message carries nothing; decoders use it as an implicit
    /// negative acknowledgement.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Panel -> controller message.
///
/// The records are independently optional; a panel typically populates one
/// per message, but programmatically constructed messages may set several.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundMessage {
    #[serde(rename = "FlowMessage", skip_serializing_if = "OutboundFlow::is_none")]
    pub flow: OutboundFlow,

    #[serde(rename = "PanelInfo", skip_serializing_if = "Option::is_none")]
    pub panel_info: Option<PanelInfo>,

    #[serde(rename = "PanelTopology", skip_serializing_if = "Option::is_none")]
    pub panel_topology: Option<PanelTopology>,

    #[serde(rename = "BurninProfile", skip_serializing_if = "Option::is_none")]
    pub burnin_profile: Option<BurninProfile>,

    #[serde(rename = "NetworkConfig", skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,

    #[serde(rename = "CalibrationProfile", skip_serializing_if = "Option::is_none")]
    pub calibration_profile: Option<CalibrationProfile>,

    #[serde(rename = "DefaultCalibrationProfile", skip_serializing_if = "Option::is_none")]
    pub default_calibration_profile: Option<CalibrationProfile>,

    #[serde(rename = "SleepTimeout", skip_serializing_if = "Option::is_none")]
    pub sleep_timeout: Option<SleepTimeout>,

    #[serde(rename = "SleepState", skip_serializing_if = "Option::is_none")]
    pub sleep_state: Option<SleepState>,

    #[serde(rename = "HeartBeatTimer", skip_serializing_if = "Option::is_none")]
    pub heartbeat_timer: Option<HeartBeatTimer>,

    #[serde(rename = "DimmedGain", skip_serializing_if = "Option::is_none")]
    pub dimmed_gain: Option<DimmedGain>,

    #[serde(rename = "Connections", skip_serializing_if = "Option::is_none")]
    pub connections: Option<Connections>,

    #[serde(rename = "RunTimeStats", skip_serializing_if = "Option::is_none")]
    pub runtime_stats: Option<RunTimeStats>,

    #[serde(rename = "ErrorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<TextMessage>,

    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    pub message: Option<TextMessage>,

    #[serde(rename = "EnvironmentalHealth", skip_serializing_if = "Option::is_none")]
    pub environmental_health: Option<RunMode>,

    #[serde(rename = "SysStat", skip_serializing_if = "Option::is_none")]
    pub sys_stat: Option<SystemStat>,

    /// Map from original hardware-component ID to its enabled/mapped flag.
    /// Iteration order is not significant on the wire.
    #[serde(rename = "HWCavailability", skip_serializing_if = "HashMap::is_empty")]
    pub hwc_availability: HashMap<u32, u32>,

    #[serde(rename = "Events", skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<HwcEvent>,

    #[serde(rename = "Registers", skip_serializing_if = "Vec::is_empty")]
    pub registers: Vec<Register>,
}

impl OutboundMessage {
    pub fn ping() -> Self {
        Self {
            flow: OutboundFlow::Ping,
            ..Default::default()
        }
    }

    pub fn ack() -> Self {
        Self {
            flow: OutboundFlow::Ack,
            ..Default::default()
        }
    }

    pub fn event(event: HwcEvent) -> Self {
        Self {
            events: vec![event],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Panel identity and capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelInfo {
    #[serde(rename = "Model", skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(rename = "Serial", skip_serializing_if = "String::is_empty")]
    pub serial: String,
    #[serde(rename = "SoftwareVersion", skip_serializing_if = "String::is_empty")]
    pub software_version: String,
    #[serde(rename = "Platform", skip_serializing_if = "String::is_empty")]
    pub platform: String,
    #[serde(rename = "BluePillReady")]
    pub blue_pill_ready: bool,
    #[serde(rename = "Name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "PanelType")]
    pub panel_type: PanelType,
    #[serde(rename = "RawPanelSupport", skip_serializing_if = "Option::is_none")]
    pub support: Option<RawPanelSupport>,
    /// Server-mode lock list; only these IPs may connect.
    #[serde(rename = "LockedToIPs", skip_serializing_if = "Vec::is_empty")]
    pub locked_to_ips: Vec<String>,
    #[serde(rename = "MaxClients")]
    pub max_clients: u32,
}

/// Physical nature of a panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelType {
    #[default]
    Unknown,
    BluePillInside,
    Physical,
    Emulation,
    Touch,
    Composite,
}

/// Capability flags advertised in a `_support=` line.
///
/// Decode accepts the flags in any order; encode always emits the canonical
/// order, so a round trip preserves the set, not the literal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPanelSupport {
    #[serde(rename = "ASCII")]
    pub ascii: bool,
    #[serde(rename = "Binary")]
    pub binary: bool,
    #[serde(rename = "ASCII_JSONfeedback")]
    pub json_feedback: bool,
    #[serde(rename = "ASCII_Inbound")]
    pub json_on_inbound: bool,
    #[serde(rename = "ASCII_Outbound")]
    pub json_on_outbound: bool,
    #[serde(rename = "System")]
    pub system: bool,
    #[serde(rename = "RawADCValues")]
    pub raw_adc_values: bool,
    #[serde(rename = "BurninProfile")]
    pub burnin_profile: bool,
    #[serde(rename = "EnvHealth")]
    pub env_health: bool,
    #[serde(rename = "Registers")]
    pub registers: bool,
    #[serde(rename = "Calibration")]
    pub calibration: bool,
    #[serde(rename = "Processors")]
    pub processors: bool,
    #[serde(rename = "NetworkSettings")]
    pub network_settings: bool,
}

/// Panel topology; JSON layout plus base SVG. Both are opaque blobs here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelTopology {
    #[serde(rename = "Svgbase", skip_serializing_if = "String::is_empty")]
    pub svgbase: String,
    #[serde(rename = "Json", skip_serializing_if = "String::is_empty")]
    pub json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurninProfile {
    #[serde(rename = "Json")]
    pub json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    #[serde(rename = "Json")]
    pub json: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepTimeout {
    #[serde(rename = "Value")]
    pub value: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepState {
    #[serde(rename = "IsSleeping")]
    pub is_sleeping: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartBeatTimer {
    #[serde(rename = "Value")]
    pub value: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimmedGain {
    #[serde(rename = "Value")]
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connections {
    #[serde(rename = "Connection")]
    pub connection: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTimeStats {
    #[serde(rename = "BootsCount")]
    pub boots_count: u32,
    /// Total uptime in minutes across all boots.
    #[serde(rename = "TotalUptime")]
    pub total_uptime: u32,
    #[serde(rename = "SessionUptime")]
    pub session_uptime: u32,
    #[serde(rename = "ScreenSaveOnTime")]
    pub screen_save_on_time: u32,
}

/// Free-form text from the panel (`Msg=` / `ErrorMsg=`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMessage {
    #[serde(rename = "Message")]
    pub message: String,
}

/// System telemetry reported by the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStat {
    #[serde(rename = "CPUUsage")]
    pub cpu_usage: u32,
    #[serde(rename = "CPUTemp")]
    pub cpu_temp: f32,
    #[serde(rename = "ExtTemp")]
    pub ext_temp: f32,
    #[serde(rename = "CPUVoltage")]
    pub cpu_voltage: f32,
    #[serde(rename = "CPUFreqCurrent")]
    pub cpu_freq_current: i32,
    #[serde(rename = "CPUFreqMin")]
    pub cpu_freq_min: i32,
    #[serde(rename = "CPUFreqMax")]
    pub cpu_freq_max: i32,
    #[serde(rename = "MemTotal")]
    pub mem_total: i32,
    #[serde(rename = "MemFree")]
    pub mem_free: i32,
    #[serde(rename = "MemAvailable")]
    pub mem_available: i32,
    #[serde(rename = "MemBuffers")]
    pub mem_buffers: i32,
    #[serde(rename = "MemCached")]
    pub mem_cached: i32,
    #[serde(rename = "UnderVoltageNow")]
    pub under_voltage_now: bool,
    #[serde(rename = "UnderVoltage")]
    pub under_voltage: bool,
    #[serde(rename = "FreqCapNow")]
    pub freq_cap_now: bool,
    #[serde(rename = "FreqCap")]
    pub freq_cap: bool,
    #[serde(rename = "ThrottledNow")]
    pub throttled_now: bool,
    #[serde(rename = "Throttled")]
    pub throttled: bool,
    #[serde(rename = "SoftTempLimitNow")]
    pub soft_temp_limit_now: bool,
    #[serde(rename = "SoftTempLimit")]
    pub soft_temp_limit: bool,
}

// ============================================================================
// Hardware component state (controller -> panel)
// ============================================================================

/// State update addressed to one or more hardware components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HwcState {
    #[serde(rename = "HWCIDs", skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<u32>,

    #[serde(rename = "HWCMode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<HwcMode>,

    #[serde(rename = "HWCColor", skip_serializing_if = "Option::is_none")]
    pub color: Option<HwcColor>,

    #[serde(rename = "HWCExtended", skip_serializing_if = "Option::is_none")]
    pub extended: Option<HwcExtended>,

    #[serde(rename = "HWCText", skip_serializing_if = "Option::is_none")]
    pub text: Option<HwcText>,

    #[serde(rename = "HWCGfx", skip_serializing_if = "Option::is_none")]
    pub gfx: Option<HwcGfx>,

    #[serde(rename = "PublishRawADCValues", skip_serializing_if = "Option::is_none")]
    pub publish_raw_adc_values: Option<PublishRawAdcValues>,
}

/// On/off/dimmed/blink state of a component, packed into one wire integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HwcMode {
    #[serde(rename = "State")]
    pub state: u32,
    /// Drives the component's output flag (GPO-style).
    #[serde(rename = "Output")]
    pub output: bool,
    #[serde(rename = "BlinkPattern")]
    pub blink_pattern: u32,
}

impl HwcMode {
    /// Unpacks a `HWC#` wire integer.
    pub fn from_wire(value: u32) -> Self {
        Self {
            state: value & 0xF,
            output: value & 0x20 == 0x20,
            blink_pattern: (value >> 8) & 0xF,
        }
    }

    /// Packs into the `HWC#` wire integer. The state field is 3 bits wide on
    /// encode (the wider decode mask tolerates older senders).
    pub fn to_wire(&self) -> u32 {
        (self.state & 0x7) | ((self.blink_pattern & 0xF) << 8) | if self.output { 0x20 } else { 0 }
    }
}

/// Component color: either a true RGB value or a palette index. The wire
/// format reduces RGB to two bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HwcColor {
    #[serde(rename = "ColorRGB")]
    Rgb {
        #[serde(rename = "Red")]
        red: u32,
        #[serde(rename = "Green")]
        green: u32,
        #[serde(rename = "Blue")]
        blue: u32,
    },
    #[serde(rename = "ColorIndex")]
    Index {
        #[serde(rename = "Index")]
        index: u32,
    },
}

/// Extended value for faders, meters and similar analog-ish components:
/// a 4-bit interpretation tag plus a 12-bit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HwcExtended {
    #[serde(rename = "Interpretation")]
    pub interpretation: u32,
    #[serde(rename = "Value")]
    pub value: u32,
}

impl HwcExtended {
    /// Value field width in the current protocol revision (12 bits).
    pub const VALUE_MASK: u32 = 0xFFF;
    /// Value field width used by pre-2.0 firmware (10 bits). Kept as the
    /// protocol-revision switch; nothing in this crate uses it.
    pub const VALUE_MASK_LEGACY: u32 = 0x3FF;

    pub fn from_wire(value: u32) -> Self {
        Self {
            interpretation: (value >> 12) & 0xF,
            value: value & Self::VALUE_MASK,
        }
    }

    pub fn to_wire(&self) -> u32 {
        (self.value & Self::VALUE_MASK) | ((self.interpretation & 0xF) << 12)
    }
}

/// Rich text-tile descriptor for display components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HwcText {
    #[serde(rename = "IntegerValue")]
    pub integer_value: i32,
    #[serde(rename = "Formatting")]
    pub formatting: u32,
    #[serde(rename = "StateIcon")]
    pub state_icon: u32,
    #[serde(rename = "ModifierIcon")]
    pub modifier_icon: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "SolidHeaderBar")]
    pub solid_header_bar: bool,
    #[serde(rename = "Textline1")]
    pub textline1: String,
    #[serde(rename = "Textline2")]
    pub textline2: String,
    #[serde(rename = "IntegerValue2")]
    pub integer_value2: i32,
    #[serde(rename = "PairMode")]
    pub pair_mode: u32,
    #[serde(rename = "Scale", skip_serializing_if = "Option::is_none")]
    pub scale: Option<TextScale>,
    #[serde(rename = "TextStyling", skip_serializing_if = "Option::is_none")]
    pub styling: Option<TextStyle>,
    #[serde(rename = "Inverted")]
    pub inverted: bool,
    #[serde(rename = "PixelColor", skip_serializing_if = "Option::is_none")]
    pub pixel_color: Option<HwcColor>,
    #[serde(rename = "BackgroundColor", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<HwcColor>,
}

impl HwcText {
    /// Formatting value that hides the integer value entirely.
    pub const FMT_HIDE: u32 = 7;
    /// Formatting value for single-line unformatted text.
    pub const FMT_ONE_LINE: u32 = 10;
    /// Formatting value for two-line unformatted text.
    pub const FMT_TWO_LINES: u32 = 11;
}

/// Scale/progress bar rendered at the bottom of a text tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextScale {
    #[serde(rename = "ScaleType")]
    pub scale_type: u32,
    #[serde(rename = "RangeLow")]
    pub range_low: i32,
    #[serde(rename = "RangeHigh")]
    pub range_high: i32,
    #[serde(rename = "LimitLow")]
    pub limit_low: i32,
    #[serde(rename = "LimitHigh")]
    pub limit_high: i32,
}

/// Font and layout styling for a text tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    #[serde(rename = "TextFont")]
    pub text_font: FontStyle,
    #[serde(rename = "TitleFont")]
    pub title_font: FontStyle,
    /// Text size for formatting modes 10/11; shares wire field 0 with the
    /// integer value.
    #[serde(rename = "UnformattedFontSize")]
    pub unformatted_font_size: u32,
    #[serde(rename = "FixedWidth")]
    pub fixed_width: bool,
    #[serde(rename = "TitleBarPadding")]
    pub title_bar_padding: u32,
    #[serde(rename = "ExtraCharacterSpacing")]
    pub extra_character_spacing: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontStyle {
    #[serde(rename = "FontFace")]
    pub font_face: u32,
    #[serde(rename = "TextWidth")]
    pub text_width: u32,
    #[serde(rename = "TextHeight")]
    pub text_height: u32,
}

/// Pixel format of a graphics payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    /// 1 bit per pixel monochrome.
    #[default]
    Mono,
    /// 4 bits per pixel grayscale.
    Gray4,
    /// 16 bits per pixel RGB (5-6-5).
    Rgb16,
}

/// An already-encoded image destined for a display component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HwcGfx {
    #[serde(rename = "ImageType")]
    pub image_type: ImageType,
    #[serde(rename = "W")]
    pub width: u32,
    #[serde(rename = "H")]
    pub height: u32,
    /// When set, the image is placed at (x, y) instead of filling the tile.
    #[serde(rename = "XYoffset")]
    pub xy_offset: bool,
    #[serde(rename = "X")]
    pub x: u32,
    #[serde(rename = "Y")]
    pub y: u32,
    #[serde(rename = "ImageData")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishRawAdcValues {
    #[serde(rename = "Enabled")]
    pub enabled: bool,
}

// ============================================================================
// Hardware component events (panel -> controller)
// ============================================================================

/// An event originating from a single hardware component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HwcEvent {
    #[serde(rename = "HWCID")]
    pub id: u32,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The payload of a hardware event; exactly one kind per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Button pressed/released, with an optional edge (top/left/bottom/right
    /// quadrant or encoder push).
    #[serde(rename = "Binary")]
    Binary {
        #[serde(rename = "Pressed")]
        pressed: bool,
        #[serde(rename = "Edge")]
        edge: u32,
    },
    /// Encoder pulses, signed.
    #[serde(rename = "Pulsed")]
    Pulsed {
        #[serde(rename = "Value")]
        value: i32,
    },
    /// Absolute position (faders), 0..1000.
    #[serde(rename = "Absolute")]
    Absolute {
        #[serde(rename = "Value")]
        value: u32,
    },
    /// Signed speed (jog wheels).
    #[serde(rename = "Speed")]
    Speed {
        #[serde(rename = "Value")]
        value: i32,
    },
    /// Raw ADC reading, only sent when enabled via `HWCrawADCValues#`.
    #[serde(rename = "RawAnalog")]
    RawAnalog {
        #[serde(rename = "Value")]
        value: u32,
    },
}

// ============================================================================
// Registers
// ============================================================================

/// Register bank selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterKind {
    Mem,
    Flag,
    Shift,
    State,
}

/// A register write, valid in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    #[serde(rename = "Reg")]
    pub reg: RegisterKind,
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Value")]
    pub value: u32,
}
