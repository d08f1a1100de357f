// SPDX-FileCopyrightText: 2026 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use hyper::{Method, StatusCode};

/// Returns true if `status` is a redirection status (3xx).
pub fn is_redirection_status(status: u16) -> bool {
    (300..=399).contains(&status)
}

/// Returns true when following a redirect with `status` turns `method` into GET
/// with no body: always for 303, and for POST on 301 and 302.
pub fn redirect_rewrites_to_get(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *method != Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn redirection_boundaries_and_neighbors() {
        assert!(!is_redirection_status(299));
        assert!(is_redirection_status(300));
        assert!(is_redirection_status(301));
        assert!(is_redirection_status(308));
        assert!(is_redirection_status(399));
        assert!(!is_redirection_status(400));
    }

    #[rstest]
    #[case(StatusCode::SEE_OTHER, Method::PUT, true)]
    #[case(StatusCode::SEE_OTHER, Method::HEAD, false)]
    #[case(StatusCode::FOUND, Method::POST, true)]
    #[case(StatusCode::MOVED_PERMANENTLY, Method::POST, true)]
    #[case(StatusCode::FOUND, Method::PUT, false)]
    #[case(StatusCode::TEMPORARY_REDIRECT, Method::POST, false)]
    #[case(StatusCode::PERMANENT_REDIRECT, Method::POST, false)]
    fn method_rewrite(#[case] status: StatusCode, #[case] method: Method, #[case] expected: bool) {
        assert_eq!(redirect_rewrites_to_get(status, &method), expected);
    }
}
