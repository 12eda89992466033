//! Coordination-store path builders.
//!
//! These are part of the wire contract (spec §3/§6): other group
//! members, possibly written in other languages, read and write the
//! exact same paths. Changing the layout here is a protocol break.

/// `/consumers/<group>/ids` -- group member registry.
#[must_use]
pub fn member_ids_path(group: &str) -> String {
    format!("/consumers/{group}/ids")
}

/// `/consumers/<group>/ids/<member_id>` -- this member's registration node.
#[must_use]
pub fn member_node_path(group: &str, member_id: &str) -> String {
    format!("{}/{}", member_ids_path(group), member_id)
}

/// `/consumers/<group>/owners/<topic>` -- partition ownership parent.
#[must_use]
pub fn owners_path(group: &str, topic: &str) -> String {
    format!("/consumers/{group}/owners/{topic}")
}

/// `/consumers/<group>/owners/<topic>/<leader_id>-<partition_id>`.
#[must_use]
pub fn owner_node_path(group: &str, topic: &str, leader_id: i32, partition_id: i32) -> String {
    format!("{}/{leader_id}-{partition_id}", owners_path(group, topic))
}

/// `/brokers/ids` -- watched for broker-set changes.
#[must_use]
pub fn brokers_ids_path() -> &'static str {
    "/brokers/ids"
}

/// `/brokers/topics` -- watched for topic-set changes.
#[must_use]
pub fn brokers_topics_path() -> &'static str {
    "/brokers/topics"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_wire_contract() {
        assert_eq!(member_ids_path("g"), "/consumers/g/ids");
        assert_eq!(member_node_path("g", "host:1"), "/consumers/g/ids/host:1");
        assert_eq!(owners_path("g", "orders"), "/consumers/g/owners/orders");
        assert_eq!(owner_node_path("g", "orders", 3, 12), "/consumers/g/owners/orders/3-12");
        assert_eq!(brokers_ids_path(), "/brokers/ids");
        assert_eq!(brokers_topics_path(), "/brokers/topics");
    }
}
