//! Backend route catalogue. Ids are inserted into paths verbatim.

pub mod auth {
    pub const STATUS: &str = "/auth/status";
    pub const ME: &str = "/auth/me";
    pub const TEST_PROTECTED: &str = "/auth/test-protected";
    pub const VALIDATE_TOKEN: &str = "/auth/validate-token";
}

pub mod sessions {
    pub const CREATE: &str = "/sessions/create";
    pub const LIST: &str = "/sessions/list";

    pub fn destroy(session_id: &str) -> String {
        format!("/sessions/{session_id}")
    }
}

pub mod query {
    pub const PREVIEW: &str = "/query/preview";
    pub const EXECUTE: &str = "/query/execute";
    pub const PROVIDERS_INFO: &str = "/query/providers-info";
}

pub mod database {
    pub const TEST_CONNECTION: &str = "/database/test-connection";
    pub const EXECUTE_QUERY: &str = "/database/execute-query";
    pub const SCHEMA: &str = "/database/schema";
}

pub mod schema {
    pub const PROPOSE: &str = "/schema/propose";
    pub const PROPOSALS: &str = "/schema/proposals";

    pub fn proposal(proposal_id: &str) -> String {
        format!("{PROPOSALS}/{proposal_id}")
    }

    pub fn approve(proposal_id: &str) -> String {
        format!("{PROPOSALS}/{proposal_id}/approve")
    }

    pub fn reject(proposal_id: &str) -> String {
        format!("{PROPOSALS}/{proposal_id}/reject")
    }
}

pub mod audit {
    pub const LOGS: &str = "/audit/logs";
    pub const STATISTICS: &str = "/audit/statistics";
    pub const EVENT_TYPES: &str = "/audit/event-types";

    pub fn session_logs(session_id: &str) -> String {
        format!("{LOGS}/session/{session_id}")
    }
}
