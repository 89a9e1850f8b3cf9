/// 게시글 목록 조회 (후기 요약 포함, 최신순)
pub const GET_POSTS: &str = r#"
    SELECT p.id, p.user_id, p.title, p.content, p.img, p.price,
           p.zones, p.activities, p.availability, p.status, p.created_at,
           COALESCE(AVG(r.stars), 0)::float8 AS rating_avg,
           COUNT(r.id) AS rating_count
    FROM posts p
    LEFT JOIN bookings b ON b.post_id = p.id
    LEFT JOIN ratings r ON r.booking_id = b.id
    GROUP BY p.id
    ORDER BY p.created_at DESC
    LIMIT $1
"#;

/// 게시글 단건 조회 (후기 요약 포함)
pub const GET_POST: &str = r#"
    SELECT p.id, p.user_id, p.title, p.content, p.img, p.price,
           p.zones, p.activities, p.availability, p.status, p.created_at,
           COALESCE(AVG(r.stars), 0)::float8 AS rating_avg,
           COUNT(r.id) AS rating_count
    FROM posts p
    LEFT JOIN bookings b ON b.post_id = p.id
    LEFT JOIN ratings r ON r.booking_id = b.id
    WHERE p.id = $1
    GROUP BY p.id
"#;

/// 예약 목록 조회, 예약자(buyer) 기준
pub const GET_BOOKINGS_AS_RENTER: &str = r#"
    SELECT * FROM bookings
    WHERE renter_id = $1
    ORDER BY created_at DESC
    LIMIT $2
"#;

/// 예약 목록 조회, 오너(seller) 기준
pub const GET_BOOKINGS_AS_OWNER: &str = r#"
    SELECT * FROM bookings
    WHERE owner_id = $1
    ORDER BY created_at DESC
    LIMIT $2
"#;

/// 예약 목록 조회, 양쪽 병합 (같은 예약이 두 번 나오지 않는다)
pub const GET_BOOKINGS_MERGED: &str = r#"
    SELECT * FROM bookings
    WHERE renter_id = $1 OR owner_id = $1
    ORDER BY created_at DESC
    LIMIT $2
"#;

/// 후기 조회, 받은 사람 기준
pub const GET_RATINGS_FOR_USER: &str = r#"
    SELECT id, booking_id, from_user, to_user, stars, comment, created_at
    FROM ratings
    WHERE to_user = $1
    ORDER BY created_at DESC
    LIMIT $2
"#;

/// 후기 조회, 예약 기준 (이미 후기를 남겼는지 확인할 때)
pub const GET_RATINGS_FOR_BOOKING: &str = r#"
    SELECT id, booking_id, from_user, to_user, stars, comment, created_at
    FROM ratings
    WHERE booking_id = $1
    ORDER BY created_at DESC
    LIMIT $2
"#;

/// 내 프로필 조회
pub const GET_PROFILE: &str =
    "SELECT id, name, surname, username, email, role, balance FROM users WHERE id = $1";

/// 사용자 잔액 조회
pub const GET_BALANCE: &str = "SELECT balance FROM users WHERE id = $1";
