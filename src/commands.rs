//! Firewall command suggestions for opening or closing a TCP port.
//!
//! Commands are rendered as text for the user to run with elevated
//! privileges. Nothing here executes them.

use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Open,
    Close,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Action::Open),
            "close" => Ok(Action::Close),
            _ => Err(Error::InvalidAction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallCommands {
    pub ufw: String,
    pub iptables: String,
    #[serde(rename = "firewall-cmd")]
    pub firewall_cmd: String,
    pub windows_netsh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCommands {
    pub ok: bool,
    pub port: u16,
    pub action: Action,
    pub commands: FirewallCommands,
}

/// Check the port is a usable TCP port (1..=65535).
pub fn validate_port(port: i64) -> Result<u16, Error> {
    match u16::try_from(port) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(Error::InvalidPort),
    }
}

pub fn firewall_commands(port: u16, action: Action) -> FirewallCommands {
    match action {
        Action::Open => FirewallCommands {
            ufw: format!("sudo ufw allow {port} && sudo ufw reload"),
            iptables: format!(
                "sudo iptables -A INPUT -p tcp --dport {port} -j ACCEPT && sudo iptables-save"
            ),
            firewall_cmd: format!(
                "sudo firewall-cmd --permanent --add-port={port}/tcp && sudo firewall-cmd --reload"
            ),
            windows_netsh: format!(
                "netsh advfirewall firewall add rule name=\"Allow Port {port}\" dir=in action=allow protocol=TCP localport={port}"
            ),
        },
        Action::Close => FirewallCommands {
            ufw: format!("sudo ufw delete allow {port} && sudo ufw reload"),
            iptables: format!(
                "sudo iptables -D INPUT -p tcp --dport {port} -j ACCEPT && sudo iptables-save"
            ),
            firewall_cmd: format!(
                "sudo firewall-cmd --permanent --remove-port={port}/tcp && sudo firewall-cmd --reload"
            ),
            windows_netsh: format!(
                "netsh advfirewall firewall delete rule name=\"Allow Port {port}\" protocol=TCP localport={port}"
            ),
        },
    }
}

/// Validate inputs and build the full `/port_commands` response.
pub fn port_commands(port: i64, action: &str) -> Result<PortCommands, Error> {
    let port = validate_port(port)?;
    let action: Action = action.parse()?;
    Ok(PortCommands {
        ok: true,
        port,
        action,
        commands: firewall_commands(port, action),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_ports() {
        assert_eq!(validate_port(0), Err(Error::InvalidPort));
        assert_eq!(validate_port(-3), Err(Error::InvalidPort));
        assert_eq!(validate_port(65536), Err(Error::InvalidPort));
        assert_eq!(validate_port(65535), Ok(65535));
    }

    #[test]
    fn action_is_case_insensitive() {
        assert_eq!("OPEN".parse::<Action>(), Ok(Action::Open));
        assert_eq!("Close".parse::<Action>(), Ok(Action::Close));
        assert_eq!("delete".parse::<Action>(), Err(Error::InvalidAction));
    }

    #[test]
    fn open_commands() {
        let c = firewall_commands(8080, Action::Open);
        assert_eq!(c.ufw, "sudo ufw allow 8080 && sudo ufw reload");
        assert_eq!(
            c.windows_netsh,
            r#"netsh advfirewall firewall add rule name="Allow Port 8080" dir=in action=allow protocol=TCP localport=8080"#
        );
    }

    #[test]
    fn close_commands() {
        let c = firewall_commands(22, Action::Close);
        assert_eq!(
            c.iptables,
            "sudo iptables -D INPUT -p tcp --dport 22 -j ACCEPT && sudo iptables-save"
        );
        assert_eq!(
            c.firewall_cmd,
            "sudo firewall-cmd --permanent --remove-port=22/tcp && sudo firewall-cmd --reload"
        );
    }

    #[test]
    fn validation_order_port_first() {
        assert_eq!(port_commands(0, "bogus"), Err(Error::InvalidPort));
        assert_eq!(port_commands(80, "bogus"), Err(Error::InvalidAction));
        let ok = serde_json::to_value(port_commands(80, "close").unwrap()).unwrap();
        assert_eq!(ok["action"], "close");
        assert_eq!(
            ok["commands"]["firewall-cmd"],
            "sudo firewall-cmd --permanent --remove-port=80/tcp && sudo firewall-cmd --reload"
        );
    }
}
