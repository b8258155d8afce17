//! Route handlers of the mock API.

use regex::Regex;
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Match, Mock, MockServer, Request, Respond, ResponseTemplate};

use super::state::{
    CLIENT_TYPES, DISH_ID, DISH_TYPES, FEEDBACK_TYPES, LOCATION_ID, MockState, Outcome,
    PREORDER_STATES, Rejection, Reservation, User, bounded_int, check_choice, check_date,
    check_email, check_image, check_name, check_object_id, check_password, check_time, dish_card,
    dish_detail, dish_summary, json_body, location_address, location_json, optional_str, query,
    required_str, segment,
};
use crate::generators;

type Handler = fn(&MockState, &Request) -> Outcome;

struct Route {
    state: Arc<MockState>,
    handler: Handler,
}

impl Respond for Route {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        (self.handler)(&self.state, request).unwrap_or_else(|rejection| {
            debug!(
                method = %request.method,
                path = request.url.path(),
                status = rejection.status(),
                "mock API rejected request"
            );
            rejection.into_response()
        })
    }
}

async fn mount(
    server: &MockServer,
    state: &Arc<MockState>,
    verb: &str,
    matcher: impl Match + 'static,
    handler: Handler,
    priority: u8,
) {
    Mock::given(method(verb))
        .and(matcher)
        .respond_with(Route {
            state: Arc::clone(state),
            handler,
        })
        .with_priority(priority)
        .mount(server)
        .await;
}

/// Mount every endpoint of the API on `server`.
pub(super) async fn mount_all(server: &MockServer, state: &Arc<MockState>) {
    mount(server, state, "GET", path("/"), root, 5).await;
    mount(server, state, "GET", path("/health"), health, 5).await;

    mount(server, state, "POST", path("/auth/signup"), signup, 5).await;
    mount(server, state, "POST", path("/auth/signin"), signin, 5).await;
    mount(server, state, "GET", path("/auth/validate"), validate, 5).await;

    mount(server, state, "GET", path("/dishes/popular"), popular_dishes, 1).await;
    mount(server, state, "GET", path("/dishes"), dishes, 5).await;
    mount(server, state, "GET", path_regex(r"^/dishes/[^/]+$"), dish, 5).await;

    mount(server, state, "GET", path("/locations"), locations, 5).await;
    mount(server, state, "GET", path("/locations/select-options"), location_options, 1).await;
    mount(
        server,
        state,
        "GET",
        path_regex(r"^/locations/[^/]+/speciality-dishes$"),
        speciality_dishes,
        5,
    )
    .await;
    mount(
        server,
        state,
        "GET",
        path_regex(r"^/locations/[^/]+/feedbacks$"),
        location_feedbacks,
        5,
    )
    .await;

    mount(server, state, "GET", path("/bookings/tables"), tables, 5).await;
    mount(server, state, "POST", path("/bookings/client"), book_client, 5).await;
    mount(server, state, "POST", path("/bookings/waiter"), book_waiter, 5).await;

    mount(server, state, "GET", path("/reservations"), reservations, 5).await;
    mount(
        server,
        state,
        "DELETE",
        path_regex(r"^/reservations/[^/]+$"),
        cancel_reservation,
        5,
    )
    .await;
    mount(
        server,
        state,
        "GET",
        path_regex(r"^/reservations/[^/]+/available-dishes$"),
        available_dishes,
        5,
    )
    .await;
    mount(
        server,
        state,
        "POST",
        path_regex(r"^/reservations/[^/]+/order/[^/]+$"),
        order_dish,
        5,
    )
    .await;

    mount(server, state, "GET", path("/cart"), cart, 5).await;
    mount(server, state, "PUT", path("/cart"), submit_cart, 5).await;

    mount(server, state, "GET", path("/users/profile"), profile, 5).await;
    mount(server, state, "PUT", path("/users/profile"), update_profile, 5).await;
    mount(server, state, "PUT", path("/users/profile/password"), change_password, 5).await;

    mount(server, state, "POST", path_regex(r"^/feedbacks/?$"), create_feedback, 5).await;
    mount(server, state, "GET", path("/feedbacks/visitor"), visitor_feedback, 5).await;

    mount(server, state, "GET", path("/reports"), reports, 5).await;
    mount(server, state, "POST", path("/reports"), create_report, 5).await;
}

fn ok(body: Value) -> Outcome {
    Ok(ResponseTemplate::new(200).set_body_json(body))
}

fn created(body: Value) -> Outcome {
    Ok(ResponseTemplate::new(201).set_body_json(body))
}

fn page(content: Vec<Value>) -> Value {
    let n = content.len();
    json!({
        "content": content,
        "totalPages": 1,
        "totalElements": n,
        "size": 20,
        "number": 0,
        "numberOfElements": n,
        "first": true,
        "last": true,
        "empty": n == 0,
    })
}

fn known_location(state: &MockState, id: &str) -> bool {
    state.seeded() && id == LOCATION_ID
}

fn known_dish(state: &MockState, id: &str) -> bool {
    state.seeded() && id == DISH_ID
}

fn owned_reservation(state: &MockState, owner: &str, id: &str) -> Option<Reservation> {
    state
        .store()
        .reservations
        .iter()
        .find(|r| r.id == id && r.owner == owner)
        .cloned()
}

fn root(_: &MockState, _: &Request) -> Outcome {
    ok(json!({"message": "Restaurant API is running"}))
}

fn health(_: &MockState, _: &Request) -> Outcome {
    ok(json!({"status": "ok"}))
}

fn signup(state: &MockState, request: &Request) -> Outcome {
    let body = json_body(request)?;
    let first_name = required_str(&body, "firstName")?;
    check_name("firstName", first_name)?;
    let last_name = required_str(&body, "lastName")?;
    check_name("lastName", last_name)?;
    let email = required_str(&body, "email")?;
    check_email(email)?;
    let password = required_str(&body, "password")?;
    check_password("password", password)?;

    {
        let mut store = state.store();
        if store.users.contains_key(email) {
            return Err(Rejection::conflict("email", "A user with this email already exists"));
        }
        store.users.insert(
            email.to_string(),
            User {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                password: password.to_string(),
                image_url: String::new(),
            },
        );
    }
    let token = MockState::issue_token(email)?;
    created(json!({
        "token": token,
        "email": email,
        "firstName": first_name,
        "lastName": last_name,
    }))
}

fn signin(state: &MockState, request: &Request) -> Outcome {
    if state.broken_signin() {
        return Err(Rejection::internal());
    }
    let body = json_body(request)?;
    let email = required_str(&body, "email")?;
    let password = required_str(&body, "password")?;
    let user = state
        .store()
        .users
        .get(email)
        .filter(|u| u.password == password)
        .cloned()
        .ok_or_else(|| Rejection::unauthorized("Invalid email or password"))?;
    ok(json!({
        "accessToken": MockState::issue_token(email)?,
        "username": format!("{} {}", user.first_name, user.last_name),
        "role": "CUSTOMER",
    }))
}

fn validate(state: &MockState, request: &Request) -> Outcome {
    let email = state.authenticate(request)?;
    ok(json!({"valid": true, "email": email}))
}

fn popular_dishes(state: &MockState, _: &Request) -> Outcome {
    let items = if state.seeded() { vec![dish_card()] } else { Vec::new() };
    ok(Value::Array(items))
}

fn dishes(state: &MockState, request: &Request) -> Outcome {
    static SORT: OnceLock<Option<Regex>> = OnceLock::new();
    if let Some(dish_type) = query(request, "dishType") {
        check_choice("dishType", &dish_type, &DISH_TYPES)?;
    }
    if let Some(sort) = query(request, "sort") {
        let valid = SORT
            .get_or_init(|| Regex::new(r"^(popularity|price),(asc|desc)$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(&sort));
        if !valid {
            return Err(Rejection::validation(
                "sort",
                "sort must be popularity or price followed by ,asc or ,desc",
            ));
        }
    }
    let items = if state.seeded() { vec![dish_summary()] } else { Vec::new() };
    ok(page(items))
}

fn dish(state: &MockState, request: &Request) -> Outcome {
    if known_dish(state, &segment(request, 1)) {
        ok(dish_detail())
    } else {
        Err(Rejection::not_found("Dish not found"))
    }
}

fn locations(state: &MockState, _: &Request) -> Outcome {
    let items = if state.seeded() { vec![location_json()] } else { Vec::new() };
    ok(Value::Array(items))
}

fn location_options(state: &MockState, _: &Request) -> Outcome {
    let items = if state.seeded() {
        vec![json!({"id": LOCATION_ID, "address": location_address()})]
    } else {
        Vec::new()
    };
    ok(Value::Array(items))
}

fn speciality_dishes(state: &MockState, request: &Request) -> Outcome {
    if known_location(state, &segment(request, 1)) {
        ok(json!([dish_card()]))
    } else {
        Err(Rejection::not_found("Location not found"))
    }
}

fn location_feedbacks(state: &MockState, request: &Request) -> Outcome {
    let location = segment(request, 1);
    if !known_location(state, &location) {
        return Err(Rejection::not_found("Location not found"));
    }
    let kind = query(request, "type").unwrap_or_else(|| FEEDBACK_TYPES[0].to_string());
    check_choice("type", &kind, &FEEDBACK_TYPES)?;
    ok(page(vec![json!({
        "id": generators::object_id(),
        "rate": "5",
        "comment": "Attentive staff and a great view",
        "userName": "Anna Petrova",
        "userAvatarUrl": "https://example.com/images/anna.png",
        "date": "2024-07-14",
        "type": kind,
        "locationId": location,
    })]))
}

fn tables(state: &MockState, request: &Request) -> Outcome {
    let location = query(request, "locationId")
        .ok_or_else(|| Rejection::validation("locationId", "locationId is required"))?;
    check_object_id("locationId", &location)?;
    if let Some(date) = query(request, "date") {
        check_date("date", &date)?;
    }
    if let Some(time) = query(request, "time") {
        check_time("time", &time)?;
    }
    if let Some(guests) = query(request, "guests") {
        if !guests.parse::<i64>().is_ok_and(|g| (1..=10).contains(&g)) {
            return Err(Rejection::validation("guests", "guests must be between 1 and 10"));
        }
    }
    if !known_location(state, &location) {
        return Err(Rejection::unknown_reference("locationId", "Location not found"));
    }
    let slots = json!(["12:00 - 14:00", "14:15 - 16:15", "18:00 - 20:00"]);
    ok(json!([
        {
            "locationId": location,
            "locationAddress": location_address(),
            "tableNumber": "1",
            "capacity": "4",
            "availableSlots": slots,
        },
        {
            "locationId": location,
            "locationAddress": location_address(),
            "tableNumber": "2",
            "capacity": "6",
            "availableSlots": slots,
        },
    ]))
}

fn book_client(state: &MockState, request: &Request) -> Outcome {
    book(state, request, false)
}

fn book_waiter(state: &MockState, request: &Request) -> Outcome {
    book(state, request, true)
}

fn book(state: &MockState, request: &Request, by_waiter: bool) -> Outcome {
    let owner = state.authenticate(request)?;
    let body = json_body(request)?;
    let location = required_str(&body, "locationId")?;
    check_object_id("locationId", location)?;
    let table = bounded_int(&body, "tableNumber", 1..=100)?;
    let date = required_str(&body, "date")?;
    check_date("date", date)?;
    let from = required_str(&body, "timeFrom")?;
    check_time("timeFrom", from)?;
    let to = required_str(&body, "timeTo")?;
    check_time("timeTo", to)?;
    let guests = bounded_int(&body, "guestsNumber", 1..=10)?;

    let customer = if by_waiter {
        let client_type = required_str(&body, "clientType")?;
        check_choice("clientType", client_type, &CLIENT_TYPES)?;
        if client_type == "CUSTOMER" {
            let name = required_str(&body, "customerName")?;
            check_name("customerName", name)?;
            Some(name.to_string())
        } else {
            None
        }
    } else {
        None
    };

    if !known_location(state, location) {
        return Err(Rejection::unknown_reference("locationId", "Location not found"));
    }
    let reservation = Reservation {
        id: generators::object_id(),
        owner,
        table,
        date: date.to_string(),
        time_slot: format!("{from} - {to}"),
        guests: guests.to_string(),
        customer,
    };
    let mut store = state.store();
    if store.reservations.iter().any(|r| r.occupies_same_slot(&reservation)) {
        return Err(Rejection::conflict(
            "tableNumber",
            "Table is already booked for this time slot",
        ));
    }
    let response = reservation.to_json();
    store.reservations.push(reservation);
    created(response)
}

fn reservations(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    let items = state
        .store()
        .reservations
        .iter()
        .filter(|r| r.owner == owner)
        .map(Reservation::to_json)
        .collect();
    ok(Value::Array(items))
}

fn cancel_reservation(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    let id = segment(request, 1);
    let mut store = state.store();
    let position = store
        .reservations
        .iter()
        .position(|r| r.id == id && r.owner == owner)
        .ok_or_else(|| Rejection::not_found("Reservation not found"))?;
    store.reservations.remove(position);
    Ok(ResponseTemplate::new(204))
}

fn available_dishes(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    owned_reservation(state, &owner, &segment(request, 1))
        .ok_or_else(|| Rejection::not_found("Reservation not found"))?;
    ok(page(vec![dish_summary()]))
}

fn order_dish(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    let reservation = owned_reservation(state, &owner, &segment(request, 1))
        .ok_or_else(|| Rejection::not_found("Reservation not found"))?;
    let dish = segment(request, 3);
    if !known_dish(state, &dish) {
        return Err(Rejection::unknown_reference("dishId", "Dish not found"));
    }
    ok(json!({
        "message": "Dish added to the order",
        "reservationId": reservation.id,
        "dishId": dish,
    }))
}

fn cart(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    let store = state.store();
    let items = store
        .preorders
        .iter()
        .filter(|p| {
            let reservation = p.get("reservationId").and_then(Value::as_str);
            store
                .reservations
                .iter()
                .any(|r| r.owner == owner && Some(r.id.as_str()) == reservation)
        })
        .cloned()
        .collect();
    ok(page(items))
}

fn submit_cart(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    let body = json_body(request)?;
    let reservation_id = required_str(&body, "reservationId")?;
    let items = match body.get("dishItems") {
        None | Some(Value::Null) => {
            return Err(Rejection::validation("dishItems", "dishItems is required"));
        }
        Some(Value::Array(items)) => items,
        Some(_) => return Err(Rejection::validation("dishItems", "dishItems must be a list")),
    };
    if items.len() > 50 {
        return Err(Rejection::validation("dishItems", "dishItems must contain at most 50 items"));
    }
    for item in items {
        let item = item
            .as_object()
            .ok_or_else(|| Rejection::validation("dishItems", "dishItems must contain objects"))?;
        required_str(item, "dishId")?;
        bounded_int(item, "dishQuantity", 1..=50)?;
    }
    let preorder_state = required_str(&body, "state")?;
    check_choice("state", preorder_state, &PREORDER_STATES)?;
    let reservation = owned_reservation(state, &owner, reservation_id)
        .ok_or_else(|| Rejection::unknown_reference("reservationId", "Reservation not found"))?;

    let preorder = json!({
        "id": generators::object_id(),
        "reservationId": reservation.id,
        "address": optional_str(&body, "address")?.unwrap_or(location_address()),
        "date": optional_str(&body, "date")?.unwrap_or(&reservation.date),
        "timeSlot": optional_str(&body, "timeSlot")?.unwrap_or(&reservation.time_slot),
        "state": preorder_state,
        "dishItems": items,
    });
    let mut store = state.store();
    store.preorders.retain(|p| {
        p.get("reservationId").and_then(Value::as_str) != Some(reservation.id.as_str())
    });
    store.preorders.push(preorder.clone());
    ok(preorder)
}

fn profile(state: &MockState, request: &Request) -> Outcome {
    let email = state.authenticate(request)?;
    let user = state
        .store()
        .users
        .get(&email)
        .cloned()
        .ok_or_else(|| Rejection::unauthorized("Unknown user"))?;
    ok(json!({
        "firstName": user.first_name,
        "lastName": user.last_name,
        "imageUrl": user.image_url,
        "email": email,
    }))
}

fn update_profile(state: &MockState, request: &Request) -> Outcome {
    let email = state.authenticate(request)?;
    let body = json_body(request)?;
    let first_name = required_str(&body, "firstName")?;
    check_name("firstName", first_name)?;
    let last_name = required_str(&body, "lastName")?;
    check_name("lastName", last_name)?;
    let image = optional_str(&body, "base64encodedImage")?;
    if let Some(image) = image {
        check_image(image)?;
    }

    let mut store = state.store();
    let user = store
        .users
        .get_mut(&email)
        .ok_or_else(|| Rejection::unauthorized("Unknown user"))?;
    user.first_name = first_name.to_string();
    user.last_name = last_name.to_string();
    if image.is_some() {
        user.image_url =
            format!("https://example.com/images/users/{}.png", generators::object_id());
    }
    ok(json!({
        "message": "Profile updated",
        "firstName": user.first_name,
        "lastName": user.last_name,
        "imageUrl": user.image_url,
    }))
}

fn change_password(state: &MockState, request: &Request) -> Outcome {
    let email = state.authenticate(request)?;
    let body = json_body(request)?;
    let old = required_str(&body, "oldPassword")?;
    let new = required_str(&body, "newPassword")?;
    check_password("newPassword", new)?;
    if new == old {
        return Err(Rejection::validation(
            "newPassword",
            "newPassword must differ from oldPassword",
        ));
    }

    let mut store = state.store();
    let user = store
        .users
        .get_mut(&email)
        .ok_or_else(|| Rejection::unauthorized("Unknown user"))?;
    if user.password != old {
        return Err(Rejection::bad_request("INVALID_PASSWORD", "Old password is incorrect"));
    }
    user.password = new.to_string();
    ok(json!({"message": "Password changed"}))
}

fn create_feedback(state: &MockState, request: &Request) -> Outcome {
    let owner = state.authenticate(request)?;
    let body = json_body(request)?;
    let reservation_id = required_str(&body, "reservationId")?;
    check_object_id("reservationId", reservation_id)?;
    let service = bounded_int(&body, "serviceRating", 1..=5)?;
    let cuisine = bounded_int(&body, "cuisineRating", 1..=5)?;
    let comments = optional_str(&body, "comments")?.unwrap_or_default();
    owned_reservation(state, &owner, reservation_id)
        .ok_or_else(|| Rejection::unknown_reference("reservationId", "Reservation not found"))?;

    let feedback = json!({
        "id": generators::object_id(),
        "reservationId": reservation_id,
        "serviceRating": service.to_string(),
        "cuisineRating": cuisine.to_string(),
        "comments": comments,
    });
    state.store().feedbacks.push(feedback.clone());
    created(feedback)
}

fn visitor_feedback(state: &MockState, request: &Request) -> Outcome {
    let reservation_id = query(request, "reservationId")
        .ok_or_else(|| Rejection::validation("reservationId", "reservationId is required"))?;
    let owner = state
        .store()
        .reservations
        .iter()
        .find(|r| r.id == reservation_id)
        .map(|r| r.owner.clone())
        .ok_or_else(|| Rejection::not_found("Reservation not found"))?;
    ok(json!({
        "accessToken": MockState::issue_token(&owner)?,
        "reservationId": reservation_id,
        "serviceRating": "5",
        "waiterImageUrl": "",
        "waiterName": "Anna Petrova",
    }))
}

fn reports(state: &MockState, request: &Request) -> Outcome {
    state.authenticate(request)?;
    for field in ["fromDateTime", "toDateTime"] {
        if let Some(value) = query(request, field) {
            check_date(field, &value)?;
        }
    }
    for field in ["locationId", "waiterId"] {
        if let Some(value) = query(request, field) {
            check_object_id(field, &value)?;
        }
    }
    ok(page(state.store().reports.clone()))
}

fn create_report(state: &MockState, request: &Request) -> Outcome {
    state.authenticate(request)?;
    let body = json_body(request)?;
    let location = required_str(&body, "locationId")?;
    check_object_id("locationId", location)?;
    let from = required_str(&body, "fromDateTime")?;
    check_date("fromDateTime", from)?;
    let to = required_str(&body, "toDateTime")?;
    check_date("toDateTime", to)?;
    if !known_location(state, location) {
        return Err(Rejection::unknown_reference("locationId", "Location not found"));
    }

    let id = generators::object_id();
    state.store().reports.push(json!({
        "id": id,
        "name": "Location performance",
        "description": format!("Generated for {from} to {to}"),
        "fromDateTime": from,
        "toDateTime": to,
        "location": location_address(),
        "waiterId": "",
        "downloadLink": "",
    }));
    Ok(ResponseTemplate::new(202).set_body_json(json!({"reportId": id, "status": "QUEUED"})))
}
