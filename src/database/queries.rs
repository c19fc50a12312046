//! SQL da base legada
//!
//! Aliases em maiúsculas (é como o Oracle devolve os nomes de coluna).
//! Códigos (tipo de usuário, sexo, natureza, tipo de contato) saem crus e
//! são convertidos em `oracle.rs`.

/// Planos odontológicos (`hsstxusu.nnumetxmen`) considerados pela integração
pub const TAXAS_ODONTO: &str = "141287944, 155616900, 163198861, 168980581, 208002771";

/// Contato principal por pessoa: telefone principal antes do e-mail principal
const SUBQUERY_CONTATO: &str = "
    (SELECT nnumepess, contato, tipo_contato
       FROM (SELECT c.nnumepess, c.contato, c.tipo_contato,
                    ROW_NUMBER() OVER (PARTITION BY c.nnumepess ORDER BY c.ordem) rn
               FROM (SELECT hssfonp.nnumepess,
                            hssfonp.cddd_fonp || hssfonp.cfonefonp AS contato,
                            hssfonp.ctipofonp AS tipo_contato,
                            1 AS ordem
                       FROM hssfonp
                      WHERE hssfonp.cprinfonp = 'S'
                     UNION ALL
                     SELECT hssemap.nnumepess,
                            hssemap.cmailemap AS contato,
                            'MAIL' AS tipo_contato,
                            2 AS ordem
                       FROM hssemap
                      WHERE hssemap.cprinemap = 'S') c)
      WHERE rn = 1) cont";

/// Colunas de uma vida, comuns a todas as consultas de beneficiário.
///
/// `departamento`, `inclusao` e `assinatura` são expressões SQL que mudam
/// conforme a consulta junta ou não `odonto_depart`/`hsstxusu`.
fn colunas_vida(departamento: &str, inclusao: &str, assinatura: &str) -> String {
    format!(
        "hssusua.nnumeusua AS NNUMEUSUA,
         hssusua.ntituusua AS TITULAR,
         hsstitu.nnumetitu AS NNUMETITU,
         hsspess.nnumepess AS NNUMEPESS,
         hssusua.cnomeusua AS NOME,
         hssusua.c_cpfusua AS CPF,
         TO_CHAR(hssusua.dnascusua, 'YYYY-MM-DD') AS NASCIMENTO,
         hssusua.c__rgusua AS RG,
         hssusua.corrgusua AS ORGAO,
         hssusua.csexousua AS CSEXOUSUA,
         hssusua.cnmaeusua AS NOME_MAE,
         hssusua.ctipousua AS CTIPOUSUA,
         hssusua.cgrauusua AS CGRAUUSUA,
         hsstitu.cnatutitu AS CNATUTITU,
         hssempr.c_cgcempr AS CNPJ_EMPRESA,
         hssempr.crazaempr AS NOME_EMPRESA,
         {departamento} AS DEPARTAMENTO,
         hsstitu.c_ceptitu AS CEP,
         NVL(hssendp.cnumeendp, hsstitu.cnumetitu) AS NUMERO_ENDERECO,
         {inclusao} AS INCLUSAO,
         TO_CHAR(hssusua.dinclusua, 'YYYY-MM-DD') AS DINCLUSUA,
         {assinatura} AS DATA_ASSINATURA"
    )
}

/// Vida por id para a API (titular ou, com `aditivo`, exigindo plano ativo)
pub fn sql_beneficiario(aditivo: bool) -> String {
    let colunas = colunas_vida(
        "NULL",
        "TO_CHAR(hsstitu.dconttitu, 'YYYY-MM-DD')",
        "TO_CHAR(hsstitu.dconttitu, 'YYYY-MM-DD')",
    );
    let mut sql = format!(
        "SELECT {colunas},
                NULL AS MMYYYY1PAGAMENTO,
                NULL AS CONTATO,
                NULL AS TIPO_CONTATO
           FROM hssusua, hsstitu, hssempr, hsspess, hssendp"
    );
    if aditivo {
        sql.push_str(", hsstxusu");
    }
    sql.push_str(
        "
          WHERE hssusua.nnumeusua = :1
            AND hssusua.nnumetitu = hsstitu.nnumetitu
            AND hsstitu.nnumeempr = hssempr.nnumeempr
            AND hssusua.nnumepess = hsspess.nnumepess
            AND hsspess.nnumepess = hssendp.nnumepess (+)",
    );
    if aditivo {
        sql.push_str(&format!(
            "
            AND hsstxusu.dcanctxusu IS NULL
            AND hsstxusu.nnumetxmen IN ({TAXAS_ODONTO})
            AND hssusua.nnumeusua = hsstxusu.nnumeusua"
        ));
    }
    sql
}

pub const SQL_CONTATOS: &str = "
    SELECT hssfonp.cddd_fonp || hssfonp.cfonefonp AS CONTATO,
           hssfonp.ctipofonp AS TIPO_CONTATO
      FROM hssfonp, hssusua
     WHERE hssusua.nnumeusua = :1
       AND hssfonp.cprinfonp = 'S'
       AND hssusua.nnumepess = hssfonp.nnumepess
    UNION ALL
    SELECT hssemap.cmailemap AS CONTATO,
           'MAIL' AS TIPO_CONTATO
      FROM hssemap, hssusua
     WHERE hssusua.nnumeusua = :2
       AND hssemap.cprinemap = 'S'
       AND hssusua.nnumepess = hssemap.nnumepess";

pub const SQL_PRIMEIRA_MENSALIDADE: &str = "
    SELECT TO_CHAR(MIN(hsspaga.dvencpaga), 'MMYYYY') AS MENSALIDADE
      FROM hssusupg, hsspaga
     WHERE hssusupg.nnumeusua = :1
       AND hssusupg.nnumepaga = hsspaga.nnumepaga";

/// Uma vida por CPF+empresa (a inclusão mais recente), limitada por `:1`
pub fn sql_elegiveis() -> String {
    let colunas = colunas_vida(
        "NULL",
        "TO_CHAR(hsstitu.dconttitu, 'YYYY-MM-DD')",
        "TO_CHAR(hsstitu.dconttitu, 'YYYY-MM-DD')",
    );
    format!(
        "SELECT * FROM (
           WITH registros_unicos AS (
             SELECT {colunas},
                    NULL AS MMYYYY1PAGAMENTO,
                    NULL AS CONTATO,
                    NULL AS TIPO_CONTATO,
                    ROW_NUMBER() OVER (PARTITION BY hssusua.c_cpfusua, hssempr.c_cgcempr
                                       ORDER BY hssusua.dinclusua DESC) AS RN
               FROM hssusua, hsstitu, hssempr, hsspess, hssendp, hsstxusu
              WHERE hsstxusu.dcanctxusu IS NULL
                AND hsstxusu.nnumetxmen IN ({TAXAS_ODONTO})
                AND hssusua.csituusua = 'A'
                AND hssusua.nnumetitu = hsstitu.nnumetitu
                AND hsstitu.nnumeempr = hssempr.nnumeempr
                AND hssusua.nnumepess = hsspess.nnumepess
                AND hsspess.nnumepess = hssendp.nnumepess (+)
                AND hssusua.nnumeusua = hsstxusu.nnumeusua)
           SELECT * FROM registros_unicos WHERE RN = 1
         ) WHERE ROWNUM <= :1"
    )
}

/// Lote de vidas com departamento já sincronizado.
///
/// `filtros` entra no fim do WHERE interno (ids e/ou data de inclusão).
pub fn sql_vidas(filtros: &str) -> String {
    let colunas = colunas_vida(
        "odonto_depart.id_odonto",
        "TO_CHAR(hsstxusu.dincltxusu, 'YYYY-MM-DD')",
        "TO_CHAR(hsstxusu.dincltxusu, 'YYYY-MM-DD')",
    );
    format!(
        "WITH registros_unicos AS (
           SELECT {colunas},
                  TO_CHAR(hsstxusu.dincltxusu, 'MMYYYY') AS MMYYYY1PAGAMENTO,
                  cont.contato AS CONTATO,
                  cont.tipo_contato AS TIPO_CONTATO,
                  ROW_NUMBER() OVER (PARTITION BY hssusua.nnumeusua
                                     ORDER BY hssusua.dinclusua DESC) AS RN
             FROM hssusua, hsstitu, hssempr, hsspess, hssendp, hsstxusu, odonto_depart,
                  {SUBQUERY_CONTATO}
            WHERE hsstxusu.dcanctxusu IS NULL
              AND hsstxusu.nnumetxmen IN ({TAXAS_ODONTO})
              AND hssusua.csituusua = 'A'
              AND hssusua.nnumetitu = hsstitu.nnumetitu (+)
              AND hsstitu.nnumeempr = hssempr.nnumeempr (+)
              AND hssusua.nnumepess = hsspess.nnumepess (+)
              AND hsspess.nnumepess = hssendp.nnumepess (+)
              AND hssusua.nnumeusua = hsstxusu.nnumeusua (+)
              AND hssusua.nnumepess = cont.nnumepess (+)
              AND (hssempr.c_cgcempr = odonto_depart.cnpj OR hssempr.ccaepempr = odonto_depart.cnpj)
              {filtros})
         SELECT * FROM registros_unicos WHERE RN = 1"
    )
}

/// Filtro `IN (:n, ...)` para `sql_vidas`, numerando a partir de `inicio`
pub fn filtro_ids(quantidade: usize, inicio: usize) -> String {
    if quantidade == 0 {
        return String::new();
    }
    let binds: Vec<String> = (inicio..inicio + quantidade).map(|i| format!(":{}", i)).collect();
    format!("AND hssusua.nnumeusua IN ({})", binds.join(", "))
}

pub fn filtro_desde(bind: usize) -> String {
    format!("AND hsstxusu.dincltxusu >= TO_DATE(:{}, 'YYYY-MM-DD')", bind)
}

/// Titular ativo por id (grupo sem titular no lote)
pub fn sql_titular_vida() -> String {
    let colunas = colunas_vida(
        "odonto_depart.id_odonto",
        "TO_CHAR(hsstxusu.dincltxusu, 'YYYY-MM-DD')",
        "TO_CHAR(SYSDATE, 'YYYY-MM-DD')",
    );
    format!(
        "SELECT {colunas},
                TO_CHAR(hsstxusu.dincltxusu, 'MMYYYY') AS MMYYYY1PAGAMENTO,
                cont.contato AS CONTATO,
                cont.tipo_contato AS TIPO_CONTATO
           FROM hssusua, hsstitu, hssempr, hsspess, hssendp, odonto_depart, hsstxusu,
                {SUBQUERY_CONTATO}
          WHERE hssusua.csituusua = 'A'
            AND hssusua.ctipousua = 'T'
            AND hssusua.nnumetitu = hsstitu.nnumetitu (+)
            AND hsstitu.nnumeempr = hssempr.nnumeempr (+)
            AND hssusua.nnumepess = hsspess.nnumepess (+)
            AND hsspess.nnumepess = hssendp.nnumepess (+)
            AND hssusua.nnumepess = cont.nnumepess (+)
            AND hssusua.nnumeusua = hsstxusu.nnumeusua (+)
            AND hssempr.c_cgcempr = odonto_depart.cnpj
            AND hssusua.nnumeusua = :1"
    )
}

pub const SQL_INSERT_ODONTO_BENEF: &str = "
    INSERT INTO odonto_benef
      (id_log, nnumeusua, id_odonto, cpf, nome, dt_envio, status_envio, http_status, msg_retorno, json_enviado)
    VALUES
      (seq_odonto_benef.NEXTVAL, :1, :2, :3, :4, SYSDATE, :5, :6, :7, :8)";

pub fn sql_cpfs_pendentes() -> String {
    format!(
        "WITH registros_unicos AS (
           SELECT hssusua.nnumeusua AS NNUMEUSUA,
                  hssusua.cnomeusua AS NOME,
                  hssusua.c_cpfusua AS CPF,
                  odonto_depart.id_odonto AS DEPARTAMENTO,
                  ROW_NUMBER() OVER (PARTITION BY hssusua.nnumeusua
                                     ORDER BY hssusua.dinclusua DESC) AS RN
             FROM hssusua, hsstitu, hssempr, hsstxusu, odonto_depart
            WHERE hsstxusu.dcanctxusu IS NULL
              AND hsstxusu.nnumetxmen IN ({TAXAS_ODONTO})
              AND hssusua.csituusua = 'A'
              AND hssusua.nnumetitu = hsstitu.nnumetitu (+)
              AND hsstitu.nnumeempr = hssempr.nnumeempr (+)
              AND hssusua.nnumeusua = hsstxusu.nnumeusua (+)
              AND (hssempr.c_cgcempr = odonto_depart.cnpj OR hssempr.ccaepempr = odonto_depart.cnpj)
              AND hssusua.nnumeusua NOT IN (SELECT nnumeusua
                                              FROM odonto_associado_emp_chk
                                             WHERE status_api = 'ENCONTRADO'))
         SELECT * FROM registros_unicos WHERE RN = 1"
    )
}

pub const SQL_INSERT_CPF_CHECK: &str = "
    INSERT INTO odonto_associado_emp_chk
      (id_log, nnumeusua, cpf, nome, status_api, http_status, msg_retorno, json_retorno, dt_execucao)
    VALUES
      (seq_odonto_ass_emp_chk.NEXTVAL, :1, :2, :3, :4, :5, :6, :7, SYSDATE)";

pub const SQL_INSERT_INCLUSAO_LOG: &str = "
    INSERT INTO API_ODONTOGROUP_LOG (NOME_BENEFICIARIO, ID_BENEFICIARIO, MENSAGEM, JSON)
    VALUES (:1, :2, :3, :4)";

// ==================== DEPARTAMENTOS ====================

pub const SQL_DEPARTAMENTOS_PENDENTES: &str = "
    SELECT t.*
      FROM (SELECT MIN(e.crazaempr) AS NOME,
                   COALESCE(e.c_cgcempr, e.ccaepempr) AS NR_CGC,
                   MAX(NVL2(e.c_cgcempr, 0, 1)) AS ISCAEPF
              FROM hssempr e
              JOIN hsstitu i ON e.nnumeempr = i.nnumeempr
             WHERE e.csituempr = 'A'
               AND (e.c_cgcempr IS NOT NULL OR e.ccaepempr IS NOT NULL)
               AND i.cnatutitu IN (3)
             GROUP BY COALESCE(e.c_cgcempr, e.ccaepempr)) t
     WHERE NOT EXISTS (SELECT 1 FROM odonto_depart d WHERE d.cnpj = t.NR_CGC)";

pub const SQL_ODONTO_DEPART: &str = "
    SELECT id_odonto AS ID_ODONTO, cnpj AS CNPJ
      FROM odonto_depart
     WHERE cnpj IS NOT NULL";

pub const SQL_ODONTO_DEPART_POR_CNPJ: &str = "
    SELECT id_odonto AS ID_ODONTO, cnpj AS CNPJ
      FROM odonto_depart
     WHERE cnpj = :1";

pub const SQL_MERGE_ODONTO_DEPART: &str = "
    MERGE INTO odonto_depart d
      USING (SELECT :1 AS cnpj, :2 AS id_odonto FROM dual) s
         ON (d.cnpj = s.cnpj)
    WHEN MATCHED THEN
      UPDATE SET d.id_odonto = s.id_odonto
    WHEN NOT MATCHED THEN
      INSERT (id_odonto, cnpj) VALUES (s.id_odonto, s.cnpj)";

pub const SQL_INSERT_ODONTO_DEPART_SEM_ID: &str = "
    INSERT INTO odonto_depart (cnpj)
      SELECT :1 FROM dual
       WHERE NOT EXISTS (SELECT 1 FROM odonto_depart d WHERE d.cnpj = :2)";

pub const SQL_UPDATE_ODONTO_DEPART: &str = "
    UPDATE odonto_depart
       SET id_odonto = :1
     WHERE cnpj = :2";

/// Empresas ativas de natureza 3, uma por CNPJ; `:1` limita
pub const SQL_EMPRESAS_ATIVAS: &str = "
    SELECT * FROM (
      SELECT MIN(hssempr.crazaempr) AS NOME,
             hssempr.c_cgcempr AS CNPJ,
             '3' AS NAT
        FROM hssempr, hsstitu
       WHERE hssempr.nnumeempr = hsstitu.nnumeempr
         AND hssempr.csituempr = 'A'
         AND hssempr.c_cgcempr IS NOT NULL
         AND hsstitu.cnatutitu IN (3)
       GROUP BY hssempr.c_cgcempr)
    WHERE ROWNUM <= :1";

pub const SQL_EMPRESA_POR_CNPJ: &str = "
    SELECT * FROM (
      SELECT DISTINCT emp.crazaempr AS NOME, emp.c_cgcempr AS CNPJ,
             titu.cnatutitu AS NAT, titu.dconttitu AS DCONTR
        FROM hsstitu titu
        JOIN hssempr emp ON titu.nnumeempr = emp.nnumeempr
       WHERE titu.csitutitu = 'A'
         AND emp.c_cgcempr = :1
       ORDER BY titu.dconttitu DESC)
    WHERE ROWNUM = 1";

pub const SQL_EMPRESA_POR_BENEFICIARIO: &str = "
    SELECT * FROM (
      SELECT DISTINCT emp.crazaempr AS NOME, emp.c_cgcempr AS CNPJ,
             titu.cnatutitu AS NAT, titu.dconttitu AS DCONTR
        FROM hssusua usu
        JOIN hsstitu titu ON usu.nnumetitu = titu.nnumetitu
        JOIN hssempr emp ON titu.nnumeempr = emp.nnumeempr
       WHERE usu.nnumeusua = :1
       ORDER BY titu.dconttitu DESC)
    WHERE ROWNUM = 1";

pub const SQL_PRIMEIRA_EMPRESA_ATIVA: &str = "
    SELECT * FROM (
      SELECT DISTINCT emp.crazaempr AS NOME, emp.c_cgcempr AS CNPJ,
             titu.cnatutitu AS NAT, titu.dconttitu AS DCONTR
        FROM hsstitu titu
        JOIN hssempr emp ON titu.nnumeempr = emp.nnumeempr
       WHERE titu.csitutitu = 'A'
       ORDER BY titu.dconttitu DESC)
    WHERE ROWNUM = 1";
