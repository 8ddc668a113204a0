//! Fixtures shared by the unit tests: result pages shaped like the portal's and
//! a login endpoint on a `wiremock` server.

use crate::session::LOGIN_PATH;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A result page whose `tbl` table has the portal's two header rows followed by `rows`.
pub(crate) fn portal_page(rows: &[String]) -> String {
    format!(
        "<html><body><form><table id=\"tbl\">\
         <tr><th colspan=\"11\">Exportar Dados</th></tr>\
         <tr><th>Cod</th><th>Rede</th><th>Tipo</th><th>Data</th><th>Hora</th><th>Mes/Ano</th>\
         <th>Estacao</th><th>Parametro</th><th>Unidade</th><th>Media</th><th>Validado</th></tr>\
         {}</table></form></body></html>",
        rows.concat()
    )
}

pub(crate) fn data_row(day: &str, hour: &str, value: &str) -> String {
    format!(
        "<tr><td>1</td><td>A</td><td>Horaria</td><td>{}</td><td>{}</td><td>01/2021</td>\
         <td>Pinheiros</td><td>O3 (Ozônio)</td><td>µg/m3</td><td>{}</td><td>Sim</td></tr>",
        day, hour, value
    )
}

pub(crate) fn row_with_blank_value(day: &str, hour: &str) -> String {
    data_row(day, hour, "  ")
}

/// Mounts a login endpoint that always answers 200.
pub(crate) async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(server)
        .await;
}
