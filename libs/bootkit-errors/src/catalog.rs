//! Static error catalog for the HTTP-facing failures raised by bootkit.

use crate::problem::Problem;
use http::StatusCode;

/// Static error definition from the catalog
#[derive(Debug, Clone, Copy)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub code: &'static str,
    pub type_url: &'static str,
}

impl ErrDef {
    #[inline]
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Problem::new(status, self.title, detail.into())
            .with_code(self.code)
            .with_type(self.type_url)
    }
}

pub const UNAUTHENTICATED: ErrDef = ErrDef {
    status: 401,
    title: "Unauthorized",
    code: "UNAUTHENTICATED",
    type_url: "https://errors.bootkit.dev/UNAUTHENTICATED",
};

pub const BAD_CREDENTIALS: ErrDef = ErrDef {
    status: 401,
    title: "Unauthorized",
    code: "BAD_CREDENTIALS",
    type_url: "https://errors.bootkit.dev/BAD_CREDENTIALS",
};

pub const INVALID_TOKEN: ErrDef = ErrDef {
    status: 401,
    title: "Unauthorized",
    code: "INVALID_TOKEN",
    type_url: "https://errors.bootkit.dev/INVALID_TOKEN",
};

pub const ACCESS_DENIED: ErrDef = ErrDef {
    status: 403,
    title: "Forbidden",
    code: "ACCESS_DENIED",
    type_url: "https://errors.bootkit.dev/ACCESS_DENIED",
};

pub const NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "Not Found",
    code: "NOT_FOUND",
    type_url: "https://errors.bootkit.dev/NOT_FOUND",
};

pub const VALIDATION_FAILED: ErrDef = ErrDef {
    status: 422,
    title: "Unprocessable Entity",
    code: "VALIDATION_FAILED",
    type_url: "https://errors.bootkit.dev/VALIDATION_FAILED",
};

pub const MISSING_TENANT: ErrDef = ErrDef {
    status: 403,
    title: "Forbidden",
    code: "MISSING_TENANT",
    type_url: "https://errors.bootkit.dev/MISSING_TENANT",
};

pub const INTERNAL: ErrDef = ErrDef {
    status: 500,
    title: "Internal Server Error",
    code: "INTERNAL",
    type_url: "https://errors.bootkit.dev/INTERNAL",
};

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn catalog_entry_becomes_problem() {
        let problem = ACCESS_DENIED.as_problem("missing authority ROLE_ADMIN");
        assert_eq!(problem.status, StatusCode::FORBIDDEN);
        assert_eq!(problem.title, "Forbidden");
        assert_eq!(problem.code, "ACCESS_DENIED");
        assert_eq!(problem.detail, "missing authority ROLE_ADMIN");
        assert_eq!(problem.type_url, "https://errors.bootkit.dev/ACCESS_DENIED");
    }

    #[test]
    fn invalid_status_falls_back_to_internal_error() {
        let def = ErrDef {
            status: 1000,
            title: "Broken",
            code: "BROKEN",
            type_url: "about:blank",
        };
        assert_eq!(def.as_problem("x").status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
