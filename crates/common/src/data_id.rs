pub const FLOW_DATA_ID_POSTFIX: &str = "-flow-rules";
pub const DEGRADE_DATA_ID_POSTFIX: &str = "-degrade-rules";
pub const SYSTEM_DATA_ID_POSTFIX: &str = "-system-rules";
pub const PARAM_FLOW_DATA_ID_POSTFIX: &str = "-param-flow-rules";
pub const AUTHORITY_DATA_ID_POSTFIX: &str = "-authority-rules";
pub const GATEWAY_FLOW_DATA_ID_POSTFIX: &str = "-gateway-flow-rules";
pub const GATEWAY_API_DATA_ID_POSTFIX: &str = "-gateway-api-rules";
pub const CLUSTER_MAP_DATA_ID_POSTFIX: &str = "-cluster-map";

/// `cc` for cluster client.
pub const CLIENT_CONFIG_DATA_ID_POSTFIX: &str = "-cc-config";
/// `cs` for cluster server.
pub const SERVER_TRANSPORT_CONFIG_DATA_ID_POSTFIX: &str = "-cs-transport-config";
pub const SERVER_FLOW_CONFIG_DATA_ID_POSTFIX: &str = "-cs-flow-config";
pub const SERVER_NAMESPACE_SET_DATA_ID_POSTFIX: &str = "-cs-namespace-set";

pub const DASHBOARD_POSTFIX: &str = "-dashboard";

pub const DEFAULT_GROUP_ID: &str = "SENTINEL_GROUP";

/// Key read by the services that enforce the rules.
pub fn data_id(app: &str, postfix: &str) -> String {
    format!("{app}{postfix}")
}

/// Key owned by the dashboard; carries the full entity list.
pub fn dashboard_data_id(app: &str, postfix: &str) -> String {
    format!("{app}{postfix}{DASHBOARD_POSTFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_id_format() {
        assert_eq!(data_id("orderSvc", FLOW_DATA_ID_POSTFIX), "orderSvc-flow-rules");
    }

    #[test]
    fn dashboard_data_id_appends_postfix() {
        assert_eq!(
            dashboard_data_id("orderSvc", DEGRADE_DATA_ID_POSTFIX),
            "orderSvc-degrade-rules-dashboard"
        );
    }

    #[test]
    fn cluster_postfixes_are_distinct() {
        let all = [
            CLUSTER_MAP_DATA_ID_POSTFIX,
            CLIENT_CONFIG_DATA_ID_POSTFIX,
            SERVER_TRANSPORT_CONFIG_DATA_ID_POSTFIX,
            SERVER_FLOW_CONFIG_DATA_ID_POSTFIX,
            SERVER_NAMESPACE_SET_DATA_ID_POSTFIX,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
