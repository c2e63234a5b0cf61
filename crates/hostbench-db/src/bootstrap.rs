//! Account and schema provisioning executed once per server session.

use hostbench_config::HarnessConfig;

/// Hosts each provisioned account may connect from.
const ACCOUNT_HOSTS: [&str; 2] = ["localhost", "%"];

/// Quota clause lifting every per-account resource limit.
const UNLIMITED: &str = "WITH MAX_QUERIES_PER_HOUR 0 MAX_CONNECTIONS_PER_HOUR 0 \
                         MAX_UPDATES_PER_HOUR 0 MAX_USER_CONNECTIONS 0";

/// Builds the provisioning script.
///
/// The anonymous account is dropped, the test and cloud accounts are created
/// for every host variant, and the test account receives full privileges on
/// the primary database, on every `<primary>_*` sibling and on the connector
/// database by name.
///
/// Names are validated by [`HarnessConfig::validate`] before they get here.
pub(crate) fn provisioning_script(
    config: &HarnessConfig,
    primary: &str,
    connector: &str,
) -> String {
    let mut statements = Vec::new();
    for host in ACCOUNT_HOSTS {
        statements.push(format!("DROP USER IF EXISTS ''@'{host}';"));
    }
    for (user, password) in [
        (config.db_user.as_str(), config.db_password.as_str()),
        (config.cloud_user.as_str(), config.cloud_password.as_str()),
    ] {
        for host in ACCOUNT_HOSTS {
            statements.push(format!(
                "CREATE USER IF NOT EXISTS '{user}'@'{host}' IDENTIFIED BY '{password}' {UNLIMITED};"
            ));
        }
    }
    statements.push(format!("CREATE DATABASE IF NOT EXISTS `{primary}`;"));
    statements.push(format!("CREATE DATABASE IF NOT EXISTS `{connector}`;"));
    let sibling_pattern = format!("{}\\_%", primary.replace('_', "\\_"));
    let user = &config.db_user;
    for host in ACCOUNT_HOSTS {
        statements.push(format!(
            "GRANT ALL PRIVILEGES ON `{primary}`.* TO '{user}'@'{host}';"
        ));
        statements.push(format!(
            "GRANT ALL PRIVILEGES ON `{sibling_pattern}`.* TO '{user}'@'{host}';"
        ));
        statements.push(format!(
            "GRANT ALL PRIVILEGES ON `{connector}`.* TO '{user}'@'{host}';"
        ));
    }
    statements.push(String::from("FLUSH PRIVILEGES;"));
    let mut sql = statements.join("\n");
    sql.push('\n');
    sql
}
