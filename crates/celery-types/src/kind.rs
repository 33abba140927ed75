//! Node kinds of the CeleryScript language.
//!
//! Every construct a sequence can contain is a variant of [`Kind`]. The
//! wire name of each variant is its snake_case spelling (`_if` keeps the
//! leading underscore).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TreeError;

macro_rules! kinds {
    ($($variant:ident => $name:literal,)*) => {
        /// A CeleryScript node kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Kind {
            $($variant,)*
        }

        impl Kind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [Kind] = &[$(Kind::$variant,)*];

            /// The wire name of this kind.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Kind::$variant => $name,)*
                }
            }
        }

        impl FromStr for Kind {
            type Err = TreeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Kind::$variant),)*
                    other => Err(TreeError::UnknownKind(other.to_string())),
                }
            }
        }
    };
}

kinds! {
    // ── Control flow ──
    Sequence => "sequence",
    If => "_if",
    Execute => "execute",
    ExecuteScript => "execute_script",
    Assertion => "assertion",
    Wait => "wait",
    Lua => "lua",

    // ── Motion ──
    MoveAbsolute => "move_absolute",
    MoveRelative => "move_relative",
    FindHome => "find_home",
    Home => "home",
    Zero => "zero",
    Calibrate => "calibrate",

    // ── Pins & peripherals ──
    ReadPin => "read_pin",
    WritePin => "write_pin",
    TogglePin => "toggle_pin",
    NamedPin => "named_pin",
    SetServoAngle => "set_servo_angle",

    // ── Messaging & device ──
    SendMessage => "send_message",
    Channel => "channel",
    TakePhoto => "take_photo",
    ReadStatus => "read_status",
    Sync => "sync",
    Reboot => "reboot",
    PowerOff => "power_off",
    EmergencyLock => "emergency_lock",
    EmergencyUnlock => "emergency_unlock",
    FactoryReset => "factory_reset",
    CheckUpdates => "check_updates",
    FlashFirmware => "flash_firmware",
    SetUserEnv => "set_user_env",
    ChangeOwnership => "change_ownership",
    DumpInfo => "dump_info",
    InstallFarmware => "install_farmware",
    UpdateFarmware => "update_farmware",
    RemoveFarmware => "remove_farmware",
    InstallFirstPartyFarmware => "install_first_party_farmware",

    // ── Resources ──
    Resource => "resource",
    ResourceUpdate => "resource_update",

    // ── RPC ──
    RpcRequest => "rpc_request",
    RpcOk => "rpc_ok",
    RpcError => "rpc_error",
    Explanation => "explanation",

    // ── Values ──
    Coordinate => "coordinate",
    Point => "point",
    PointGroup => "point_group",
    Tool => "tool",
    Nothing => "nothing",
    Pair => "pair",

    // ── Variables & scopes ──
    Identifier => "identifier",
    ScopeDeclaration => "scope_declaration",
    ParameterDeclaration => "parameter_declaration",
    VariableDeclaration => "variable_declaration",
    ParameterApplication => "parameter_application",

    // ── Internal entry points ──
    InternalEntryPoint => "internal_entry_point",
    InternalFarmEvent => "internal_farm_event",
    InternalRegimen => "internal_regimen",
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
